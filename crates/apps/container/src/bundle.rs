//! Publishing and wiring of the container bundle.
use std::sync::Arc;

use federation::{
    ConfigError, EventBus, Exports, Federation, FederationBuilder, FederationConfig,
    FederationError, ModuleCatalog, ModuleContext, RemoteEntryDocument, RemoteManifest,
    SharedScope, Store,
};
use ui_runtime::UiRuntime;

use crate::components::{App, Button, StoreProvider};
use crate::contract;
use crate::hooks::StoreActions;
use crate::services::ProductService;
use crate::state::{HostReducer, HostState};

/// Bundle name other bundles address this one by.
pub const NAME: &str = "container";

/// File name of the published entry document.
pub const ENTRY_FILE: &str = "remoteEntry.json";

/// Default federation settings shipped with the bundle.
pub const CONFIG: &str = include_str!("../federation.toml");

/// Module ids inside the entry document.
pub mod modules {
    pub const BUTTON: &str = "button";
    pub const USE_STORE: &str = "useStore";
    pub const USE_STORE_SELECTOR: &str = "useStoreSelector";
    pub const STORE_STATE: &str = "storeState";
    pub const STORE_PROVIDER: &str = "storeProvider";

    pub const ALL: [&str; 5] = [
        BUTTON,
        USE_STORE,
        USE_STORE_SELECTOR,
        STORE_STATE,
        STORE_PROVIDER,
    ];
}

pub fn default_config() -> Result<FederationConfig, ConfigError> {
    FederationConfig::from_toml_str(CONFIG)
}

/// The host: owner of the store and provider of the exposed modules.
pub struct ContainerBundle {
    store: Store<HostReducer>,
    actions: StoreActions,
}

impl ContainerBundle {
    pub fn new(products: ProductService) -> Self {
        Self::from_store(Store::new(HostReducer), products)
    }

    /// Publish store transitions on `event_bus`.
    pub fn with_event_bus(products: ProductService, event_bus: EventBus) -> Self {
        Self::from_store(Store::with_event_bus(HostReducer, event_bus), products)
    }

    fn from_store(store: Store<HostReducer>, products: ProductService) -> Self {
        let actions = StoreActions::new(store.json_bridge(), products);
        Self { store, actions }
    }

    pub fn store(&self) -> &Store<HostReducer> {
        &self.store
    }

    pub fn actions(&self) -> &StoreActions {
        &self.actions
    }

    /// Link the exposed module factories into `catalog`.
    pub fn register(&self, catalog: &ModuleCatalog) {
        catalog.register(NAME, modules::BUTTON, |ctx| {
            Ok(Exports::component(Button::new(ui_runtime_of(ctx)?)))
        });

        let actions = self.actions.clone();
        catalog.register(NAME, modules::USE_STORE, move |_| {
            Ok(Exports::value(actions.hooks()))
        });

        let store = self.store.clone();
        catalog.register(NAME, modules::USE_STORE_SELECTOR, move |_| {
            Ok(Exports::value(store.json_bridge()))
        });

        catalog.register(NAME, modules::STORE_STATE, |_| {
            let initial = serde_json::to_value(HostState::default()).map_err(|e| e.to_string())?;
            Ok(Exports::value(initial))
        });

        let store = self.store.clone();
        catalog.register(NAME, modules::STORE_PROVIDER, move |ctx| {
            Ok(Exports::component(StoreProvider::new(
                ui_runtime_of(ctx)?,
                store.json_bridge(),
            )))
        });
    }

    pub fn entry() -> RemoteEntryDocument {
        modules::ALL
            .into_iter()
            .fold(RemoteEntryDocument::new(NAME), |entry, id| entry.module(id))
    }

    /// Manifest for `entry`, exposing and sharing what `config` declares.
    pub fn manifest(
        config: &FederationConfig,
        entry: &[u8],
    ) -> Result<RemoteManifest, ConfigError> {
        let mut manifest = RemoteManifest::new(NAME, ENTRY_FILE, &contract::surface());
        for (path, module_id) in &config.exposes {
            manifest = manifest.expose(path, module_id.clone());
        }
        for requirement in config.shared_requirements()? {
            manifest = manifest.share(requirement.to_declaration());
        }
        Ok(manifest.with_entry_integrity(entry))
    }

    /// Registers this bundle's modules and returns a builder for the host
    /// federation, providing the UI runtime this bundle ships.
    pub fn federation_builder(
        &self,
        config: &FederationConfig,
        catalog: Arc<ModuleCatalog>,
        scope: Arc<SharedScope>,
    ) -> Result<FederationBuilder, ConfigError> {
        self.register(&catalog);
        Ok(Federation::builder(NAME)
            .config(config)?
            .catalog(catalog)
            .shared_scope(scope)
            .provide(ui_runtime::LIBRARY, ui_runtime::version(), ui_runtime::provider()))
    }

    /// Host page embedding `remote/TestPage`, requested now and rendered as it settles.
    pub async fn app(federation: &Federation) -> Result<App, FederationError> {
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
        let test_page = federation.request(crate::components::app::TEST_PAGE)?;
        Ok(App::new(runtime, test_page))
    }
}

fn ui_runtime_of(ctx: &ModuleContext) -> Result<Arc<UiRuntime>, String> {
    ctx.shared
        .instance::<UiRuntime>(ui_runtime::LIBRARY)
        .ok_or_else(|| format!("{} was not resolved for {}", ui_runtime::LIBRARY, ctx.remote))
}
