//! Remote entries and the containers they initialize.
//!
//! Fetching an entry yields bytes; an [`EntryExecutor`] turns those bytes plus
//! the already-resolved shared instances into a [`RemoteContainer`] from which
//! exposed modules are extracted by id. [`CatalogExecutor`] binds entry module
//! ids to factories linked into this process through a [`ModuleCatalog`].
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::api::{Exports, FederationError, Result};
use crate::manifest::RemoteDescriptor;
use crate::shared::SingletonEntry;

/// Shared library instances resolved for one remote before its entry runs.
#[derive(Debug, Clone, Default)]
pub struct SharedInstances {
    entries: BTreeMap<String, SingletonEntry>,
}

impl SharedInstances {
    pub fn insert(&mut self, entry: SingletonEntry) {
        self.entries.insert(entry.library.clone(), entry);
    }

    pub fn get(&self, library: &str) -> Option<&SingletonEntry> {
        self.entries.get(library)
    }

    /// Typed instance of `library`.
    pub fn instance<T: std::any::Any + Send + Sync>(&self, library: &str) -> Option<Arc<T>> {
        self.entries.get(library)?.instance.downcast::<T>()
    }

    pub fn libraries(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Everything a module factory sees when its module is initialized.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    pub remote: String,
    pub module_id: String,
    pub shared: SharedInstances,
}

/// Initializes one exposed module.
pub type ModuleFactory =
    Arc<dyn Fn(&ModuleContext) -> std::result::Result<Exports, String> + Send + Sync>;

/// Module code linked into this process, keyed by bundle name and module id.
#[derive(Default)]
pub struct ModuleCatalog {
    factories: RwLock<HashMap<(String, String), ModuleFactory>>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for `bundle`'s module `module_id`.
    ///
    /// If a factory already exists for this key, it will be replaced.
    pub fn register<F>(&self, bundle: &str, module_id: &str, factory: F)
    where
        F: Fn(&ModuleContext) -> std::result::Result<Exports, String> + Send + Sync + 'static,
    {
        self.factories
            .write()
            .insert((bundle.to_string(), module_id.to_string()), Arc::new(factory));
    }

    pub fn get(&self, bundle: &str, module_id: &str) -> Option<ModuleFactory> {
        self.factories
            .read()
            .get(&(bundle.to_string(), module_id.to_string()))
            .cloned()
    }

    pub fn contains(&self, bundle: &str, module_id: &str) -> bool {
        self.get(bundle, module_id).is_some()
    }
}

/// Entry document as served next to a manifest (`remoteEntry.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntryDocument {
    pub name: String,
    pub modules: Vec<String>,
}

impl RemoteEntryDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modules: Vec::new(),
        }
    }

    pub fn module(mut self, module_id: impl Into<String>) -> Self {
        self.modules.push(module_id.into());
        self
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// An initialized remote entry.
pub struct RemoteContainer {
    name: String,
    modules: BTreeMap<String, ModuleFactory>,
    shared: SharedInstances,
}

impl RemoteContainer {
    pub fn new(
        name: impl Into<String>,
        modules: BTreeMap<String, ModuleFactory>,
        shared: SharedInstances,
    ) -> Self {
        Self {
            name: name.into(),
            modules,
            shared,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module_ids(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Initialize `module_id` against the container's shared instances.
    pub fn get(&self, module_id: &str) -> Result<Exports> {
        let factory = self
            .modules
            .get(module_id)
            .ok_or_else(|| FederationError::EntryMalformed {
                remote: self.name.clone(),
                reason: format!("entry does not contain module '{}'", module_id),
            })?;

        let context = ModuleContext {
            remote: self.name.clone(),
            module_id: module_id.to_string(),
            shared: self.shared.clone(),
        };
        factory(&context).map_err(|reason| FederationError::EntryMalformed {
            remote: self.name.clone(),
            reason: format!("module '{}' failed to initialize: {}", module_id, reason),
        })
    }
}

/// Executes a fetched entry.
#[async_trait]
pub trait EntryExecutor: Send + Sync {
    async fn execute(
        &self,
        descriptor: &RemoteDescriptor,
        entry: &[u8],
        shared: SharedInstances,
    ) -> Result<RemoteContainer>;
}

/// Executor that binds entry module ids to factories in a [`ModuleCatalog`].
pub struct CatalogExecutor {
    catalog: Arc<ModuleCatalog>,
}

impl CatalogExecutor {
    pub fn new(catalog: Arc<ModuleCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl EntryExecutor for CatalogExecutor {
    async fn execute(
        &self,
        descriptor: &RemoteDescriptor,
        entry: &[u8],
        shared: SharedInstances,
    ) -> Result<RemoteContainer> {
        let malformed = |reason: String| FederationError::EntryMalformed {
            remote: descriptor.name.clone(),
            reason,
        };

        let document: RemoteEntryDocument =
            serde_json::from_slice(entry).map_err(|e| malformed(e.to_string()))?;
        if document.name != descriptor.name {
            return Err(malformed(format!(
                "entry belongs to '{}'",
                document.name
            )));
        }

        let mut modules = BTreeMap::new();
        for module_id in document.modules {
            let factory = self
                .catalog
                .get(&descriptor.name, &module_id)
                .ok_or_else(|| malformed(format!("module '{}' is not linked into this process", module_id)))?;
            modules.insert(module_id, factory);
        }

        tracing::debug!(
            "Initialized entry for '{}' with {} modules and shared [{}]",
            descriptor.name,
            modules.len(),
            shared.libraries().collect::<Vec<_>>().join(", ")
        );
        Ok(RemoteContainer::new(descriptor.name.clone(), modules, shared))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractSurface;
    use crate::manifest::RemoteManifest;
    use semver::Version;
    use url::Url;

    fn descriptor() -> RemoteDescriptor {
        let manifest = RemoteManifest::new(
            "widgets",
            "remoteEntry.json",
            &ContractSurface::new(Version::new(1, 0, 0)),
        )
        .expose("./Card", "cardModule");
        let url = Url::parse("https://widgets.example/mf-manifest.json").unwrap();
        RemoteDescriptor::from_manifest("widgets", &url, manifest).unwrap()
    }

    fn catalog() -> Arc<ModuleCatalog> {
        let catalog = Arc::new(ModuleCatalog::new());
        catalog.register("widgets", "cardModule", |ctx| {
            Ok(Exports::value(format!("card from {}", ctx.remote)))
        });
        catalog.register("widgets", "brokenModule", |_| Err("boom".to_string()));
        catalog
    }

    #[tokio::test]
    async fn executes_entry_against_catalog() {
        let executor = CatalogExecutor::new(catalog());
        let entry = RemoteEntryDocument::new("widgets").module("cardModule");
        let container = executor
            .execute(&descriptor(), entry.to_json_pretty().unwrap().as_bytes(), SharedInstances::default())
            .await
            .unwrap();

        match container.get("cardModule").unwrap() {
            Exports::Value(value) => {
                assert_eq!(value.downcast_ref::<String>().unwrap(), "card from widgets")
            }
            other => panic!("unexpected exports: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unlinked_module_is_malformed_entry() {
        let executor = CatalogExecutor::new(catalog());
        let entry = RemoteEntryDocument::new("widgets").module("ghostModule");
        let err = executor
            .execute(&descriptor(), entry.to_json_pretty().unwrap().as_bytes(), SharedInstances::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, FederationError::EntryMalformed { .. }));
    }

    #[tokio::test]
    async fn foreign_entry_is_rejected() {
        let executor = CatalogExecutor::new(catalog());
        let entry = RemoteEntryDocument::new("gadgets").module("cardModule");
        assert!(executor
            .execute(&descriptor(), entry.to_json_pretty().unwrap().as_bytes(), SharedInstances::default())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn failing_factory_surfaces_reason() {
        let executor = CatalogExecutor::new(catalog());
        let entry = RemoteEntryDocument::new("widgets").module("brokenModule");
        let container = executor
            .execute(&descriptor(), entry.to_json_pretty().unwrap().as_bytes(), SharedInstances::default())
            .await
            .unwrap();
        match container.get("brokenModule").unwrap_err() {
            FederationError::EntryMalformed { reason, .. } => assert!(reason.contains("boom")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
