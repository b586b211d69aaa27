//! Publishing and wiring of the remote bundle.
use std::sync::Arc;

use federation::{
    ConfigError, Exports, Federation, FederationBuilder, FederationConfig, FederationError,
    ModuleCatalog, ModuleContext, RemoteEntryDocument, RemoteManifest, Result, SharedScope,
};
use ui_runtime::UiRuntime;

use crate::app::App;
use crate::contract;
use crate::pages::TestPage;

pub const NAME: &str = "remote";

/// Bundle this one consumes.
pub const CONTAINER: &str = "container";

pub const BUTTON: &str = "container/Button";

pub const ENTRY_FILE: &str = "remoteEntry.json";

pub const CONFIG: &str = include_str!("../federation.toml");

pub mod modules {
    pub const TEST_PAGE: &str = "testPage";
}

pub fn default_config() -> std::result::Result<FederationConfig, ConfigError> {
    FederationConfig::from_toml_str(CONFIG)
}

/// Stateless: everything the remote renders comes from the container.
pub struct RemoteBundle;

impl RemoteBundle {
    /// Builder of this bundle's federation, providing the UI runtime it ships.
    pub fn federation_builder(
        config: &FederationConfig,
        catalog: Arc<ModuleCatalog>,
        scope: Arc<SharedScope>,
    ) -> std::result::Result<FederationBuilder, ConfigError> {
        Ok(Federation::builder(NAME)
            .config(config)?
            .catalog(catalog)
            .shared_scope(scope)
            .provide(ui_runtime::LIBRARY, ui_runtime::version(), ui_runtime::provider()))
    }

    /// Link the exposed factories into `federation`'s catalog.
    ///
    /// Modules reach the container through `federation`.
    pub fn register(federation: &Federation) {
        let consumer = federation.clone();
        federation
            .catalog()
            .register(NAME, modules::TEST_PAGE, move |ctx| {
                let runtime = ui_runtime_of(ctx)?;
                let button = consumer.request(BUTTON).map_err(|e| e.to_string())?;
                Ok(Exports::component(TestPage::new(runtime, button)))
            });
    }

    pub fn entry() -> RemoteEntryDocument {
        RemoteEntryDocument::new(NAME).module(modules::TEST_PAGE)
    }

    pub fn manifest(
        config: &FederationConfig,
        entry: &[u8],
    ) -> std::result::Result<RemoteManifest, ConfigError> {
        let mut manifest = RemoteManifest::new(NAME, ENTRY_FILE, &contract::surface());
        for (path, module_id) in &config.exposes {
            manifest = manifest.expose(path, module_id.clone());
        }
        for requirement in config.shared_requirements()? {
            manifest = manifest.share(requirement.to_declaration());
        }
        Ok(manifest.with_entry_integrity(entry))
    }

    /// Fail fast if the deployed container no longer serves what this bundle reads.
    pub async fn check_container(federation: &Federation) -> Result<()> {
        let descriptor = federation.loader().resolver().resolve(CONTAINER).await?;
        contract::container_expectation().check(CONTAINER, &descriptor.contract)?;
        tracing::info!(
            "Container contract {} satisfies this bundle",
            descriptor.contract.version
        );
        Ok(())
    }

    /// Stand-alone page rendering a default `container/Button`.
    pub async fn app(federation: &Federation) -> Result<App> {
        let runtime = federation
            .scope()
            .resolve_for(federation.name(), ui_runtime::LIBRARY)
            .await?;
        let runtime = runtime.instance.downcast::<UiRuntime>().ok_or_else(|| {
            FederationError::SharedInstantiation {
                library: ui_runtime::LIBRARY.to_string(),
                reason: "instance is not a UI runtime".to_string(),
            }
        })?;
        Ok(App::new(runtime, federation.request(BUTTON)?))
    }
}

fn ui_runtime_of(ctx: &ModuleContext) -> std::result::Result<Arc<UiRuntime>, String> {
    ctx.shared
        .instance::<UiRuntime>(ui_runtime::LIBRARY)
        .ok_or_else(|| format!("{} was not resolved for {}", ui_runtime::LIBRARY, ctx.remote))
}
