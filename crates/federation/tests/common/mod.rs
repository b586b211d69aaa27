//! Fixtures shared by the federation integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use federation::{
    Component, ContractSurface, Exports, FetchError, Fetcher, InstanceHandle, LibraryProvider,
    ModuleCatalog, RemoteEntryDocument, RemoteManifest, SharedRequirement, StaticFetcher,
    SymbolShape,
};
use semver::Version;
use serde_json::Value;
use tokio::sync::Semaphore;
use url::Url;

pub const HOST: &str = "container";
pub const WIDGETS: &str = "widgets";

pub fn manifest_url(remote: &str) -> Url {
    Url::parse(&format!("https://{remote}.example/mf-manifest.json")).expect("valid url")
}

pub fn entry_url(remote: &str) -> Url {
    Url::parse(&format!("https://{remote}.example/remoteEntry.json")).expect("valid url")
}

/// Stand-in for the shared UI runtime library.
#[derive(Debug)]
pub struct UiRuntime {
    pub version: Version,
}

/// Card component exposed by the `widgets` remote.
pub struct Card {
    runtime: Option<Arc<UiRuntime>>,
}

impl Component for Card {
    fn render(&self, props: &Value) -> String {
        let title = props["title"].as_str().unwrap_or("untitled");
        match &self.runtime {
            Some(runtime) => format!("<article data-ui=\"{}\">{}</article>", runtime.version, title),
            None => format!("<article>{}</article>", title),
        }
    }
}

pub type PriceFormatter = fn(u64) -> String;

fn format_price(cents: u64) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}

pub fn widgets_contract() -> ContractSurface {
    ContractSurface::new(Version::new(1, 2, 0))
        .with_symbol("./Card", SymbolShape::component(["title"]))
        .with_symbol("./formatPrice", SymbolShape::function(1))
}

/// Manifest of a remote exposing `./Card` and requiring `ui-runtime` at `range`.
pub fn widgets_manifest(range: &str, entry: &[u8]) -> String {
    RemoteManifest::new(WIDGETS, "remoteEntry.json", &widgets_contract())
        .expose("./Card", "cardModule")
        .expose("./formatPrice", "priceModule")
        .share(
            SharedRequirement::parse("ui-runtime", range)
                .expect("valid range")
                .singleton()
                .to_declaration(),
        )
        .with_entry_integrity(entry)
        .to_json_pretty()
        .expect("manifest serializes")
}

pub fn widgets_entry() -> Vec<u8> {
    RemoteEntryDocument::new(WIDGETS)
        .module("cardModule")
        .module("priceModule")
        .to_json_pretty()
        .expect("entry serializes")
        .into_bytes()
}

pub fn register_widgets(catalog: &ModuleCatalog) {
    catalog.register(WIDGETS, "cardModule", |ctx| {
        Ok(Exports::component(Card {
            runtime: ctx.shared.instance::<UiRuntime>("ui-runtime"),
        }))
    });
    catalog.register(WIDGETS, "priceModule", |_| Ok(Exports::value(format_price as PriceFormatter)));
}

/// Publishes the widgets deployment into `fetcher`.
pub fn publish_widgets(fetcher: &StaticFetcher, range: &str) {
    let entry = widgets_entry();
    fetcher.insert(&manifest_url(WIDGETS), widgets_manifest(range, &entry));
    fetcher.insert(&entry_url(WIDGETS), entry);
}

/// Provider of one `ui-runtime` version counting instantiations.
pub fn ui_runtime_provider(version: Version, instantiations: Arc<AtomicUsize>) -> Arc<dyn LibraryProvider> {
    Arc::new(move || {
        instantiations.fetch_add(1, Ordering::SeqCst);
        Ok::<_, String>(InstanceHandle::new(UiRuntime {
            version: version.clone(),
        }))
    })
}

/// Fetcher that holds every response until the gate opens.
pub struct GatedFetcher {
    pub inner: StaticFetcher,
    gate: Semaphore,
}

impl GatedFetcher {
    pub fn closed(inner: StaticFetcher) -> Self {
        Self {
            inner,
            gate: Semaphore::new(0),
        }
    }

    pub fn open(&self) {
        self.gate.add_permits(1024);
    }
}

#[async_trait]
impl Fetcher for GatedFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| FetchError::NotFound(url.to_string()))?;
        self.inner.fetch(url).await
    }
}
