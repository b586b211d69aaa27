//! Compose both bundles in this process and render the host page.
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use container_app::ContainerBundle;
use container_app::services::ProductService;
use container_app::services::product::DEFAULT_PRODUCTS_URL;
use federation::{
    DefaultFetcher, EventBus, FederationConfig, ModuleCatalog, SharedScope, Topic,
};
use remote_app::RemoteBundle;
use url::Url;

use super::publish_all;

/// Publish both bundles locally, then render the container page
#[derive(Parser, Debug)]
pub struct Run {
    /// Directory the local deployment is written to
    #[arg(long, default_value = "dist")]
    pub dist: PathBuf,

    /// Use the URLs from configuration instead of the local deployment
    #[arg(long)]
    pub configured_remotes: bool,

    /// Product listing endpoint
    #[arg(long, default_value = DEFAULT_PRODUCTS_URL)]
    pub products_url: Url,

    /// Fetch the product list into the host store before rendering
    #[arg(long)]
    pub fetch_products: bool,
}

impl Run {
    pub async fn execute(self) -> Result<()> {
        let published = publish_all(&self.dist)?;
        let mut local = BTreeMap::new();
        if !self.configured_remotes {
            local.insert("FEDERATION_REMOTE_CONTAINER", published.container.to_string());
            local.insert("FEDERATION_REMOTE_REMOTE", published.remote.to_string());
        }
        let lookup = |key: &str| {
            std::env::var(key)
                .ok()
                .or_else(|| local.get(key).cloned())
        };

        let host_config = host_config(&lookup)?;
        let mut remote_config = remote_app::bundle::default_config()?;
        remote_config.environment = host_config.environment;
        remote_config.apply_overrides(&lookup)?;

        let event_bus = EventBus::with_capacity(host_config.loader.event_buffer_size);
        spawn_event_log(&event_bus);

        let fetcher = Arc::new(DefaultFetcher::new());
        let catalog = Arc::new(ModuleCatalog::new());
        let scope = Arc::new(SharedScope::new().with_event_bus(event_bus.clone()));

        let products = ProductService::new(fetcher.clone(), self.products_url);
        let container = ContainerBundle::with_event_bus(products, event_bus.clone());
        let host = container
            .federation_builder(&host_config, Arc::clone(&catalog), Arc::clone(&scope))?
            .fetcher(fetcher.clone())
            .event_bus(event_bus.clone())
            .start()
            .await;
        let remote = RemoteBundle::federation_builder(&remote_config, catalog, scope)?
            .fetcher(fetcher)
            .event_bus(event_bus)
            .build();
        RemoteBundle::register(&remote);

        if let Err(err) = RemoteBundle::check_container(&remote).await {
            tracing::warn!("Container contract check failed ({}): {}", err.kind(), err);
        }

        if self.fetch_products {
            match container.actions().get_product_list().await {
                Ok(count) => tracing::info!("Stored {} products", count),
                Err(err) => tracing::warn!("{}", err),
            }
        }

        let app = ContainerBundle::app(&host)
            .await
            .context("Failed to build the container page")?;
        println!("{}", app.render());

        if let Err(err) = app.test_page().wait().await {
            tracing::warn!("remote/TestPage unavailable ({}): {}", err.kind(), err);
        }
        if let Err(err) = remote.load_with_retry(remote_app::bundle::BUTTON).await {
            tracing::warn!("container/Button unavailable ({}): {}", err.kind(), err);
        }
        println!("{}", app.render());

        let counter = container.store().get_snapshot().counter.value;
        tracing::info!(
            "Host store at revision {} (counter {})",
            container.store().revision(),
            counter
        );
        Ok(())
    }
}

/// Host configuration: `FEDERATION_CONFIG` if set, the bundled defaults
/// otherwise, with overrides applied through `lookup`.
fn host_config<F>(lookup: &F) -> Result<FederationConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match std::env::var("FEDERATION_CONFIG") {
        Ok(path) => FederationConfig::load(&path)
            .with_context(|| format!("Failed to load FEDERATION_CONFIG={}", path))?,
        Err(_) => container_app::bundle::default_config()?,
    };
    config.apply_overrides(lookup)?;
    Ok(config)
}

fn spawn_event_log(event_bus: &EventBus) {
    for topic in [Topic::Module, Topic::Shared, Topic::State] {
        let mut events = event_bus.subscribe(topic);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => tracing::debug!("{:?}", event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("{:?} event log skipped {} events", topic, skipped);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}
