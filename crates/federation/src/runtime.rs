//! Federation orchestrator.
//!
//! A [`Federation`] is one bundle's view of the composed application: its
//! configured remotes, the shared scope it participates in, the catalog of
//! module code linked into the process, and the loader tying them together.
//! Built through [`FederationBuilder`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use semver::Version;
use tokio::sync::broadcast;
use url::Url;

use crate::api::{ModuleHandle, ModuleSpecifier, Result};
use crate::config::{ConfigError, FederationConfig};
use crate::events::{Event, EventBus, Topic};
use crate::fetch::{DefaultFetcher, Fetcher};
use crate::loader::{
    CatalogExecutor, EntryExecutor, LazyModule, ModuleCatalog, ModuleLoader, RetryPolicy,
};
use crate::manifest::ManifestResolver;
use crate::shared::{LibraryProvider, SharedRequirement, SharedScope, SingletonEntry};

/// One bundle's handle on the federation.
///
/// Cheap to clone; clones share caches, scope and event bus.
#[derive(Clone)]
pub struct Federation {
    name: Arc<str>,
    loader: ModuleLoader,
    catalog: Arc<ModuleCatalog>,
    event_bus: EventBus,
    retry: RetryPolicy,
}

impl Federation {
    pub fn builder(name: impl Into<String>) -> FederationBuilder {
        FederationBuilder::new(name)
    }

    /// Bundle name this federation acts as.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    pub fn scope(&self) -> &Arc<SharedScope> {
        self.loader.scope()
    }

    pub fn catalog(&self) -> &Arc<ModuleCatalog> {
        &self.catalog
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Load `remote/Module`.
    pub async fn load(&self, specifier: &str) -> Result<ModuleHandle> {
        let specifier: ModuleSpecifier = specifier.parse()?;
        self.loader.load(specifier.remote(), specifier.path()).await
    }

    /// Start loading `remote/Module` and return immediately.
    pub fn request(&self, specifier: &str) -> Result<LazyModule> {
        Ok(self.loader.request(specifier.parse()?))
    }

    /// Load `remote/Module`, retrying transient failures with the configured policy.
    pub async fn load_with_retry(&self, specifier: &str) -> Result<ModuleHandle> {
        let specifier: ModuleSpecifier = specifier.parse()?;
        self.loader
            .load_with_retry(specifier.remote(), specifier.path(), &self.retry)
            .await
    }

    /// Resolve eagerly shared singletons. Conflicts are logged, not fatal.
    pub async fn resolve_eager(&self) -> Vec<(String, Result<SingletonEntry>)> {
        let outcomes = self.scope().resolve_eager().await;
        for (library, outcome) in &outcomes {
            match outcome {
                Ok(entry) => tracing::info!(
                    "Eager shared library {}@{} ready (provided by {})",
                    library,
                    entry.resolved_version,
                    entry.provided_by
                ),
                Err(err) => tracing::warn!("Eager shared library {} unavailable: {}", library, err),
            }
        }
        outcomes
    }
}

struct ProvidedLibrary {
    library: String,
    version: Version,
    provider: Arc<dyn LibraryProvider>,
}

/// Builder for [`Federation`].
pub struct FederationBuilder {
    name: String,
    remotes: BTreeMap<String, Url>,
    fetcher: Option<Arc<dyn Fetcher>>,
    executor: Option<Arc<dyn EntryExecutor>>,
    catalog: Option<Arc<ModuleCatalog>>,
    scope: Option<Arc<SharedScope>>,
    event_bus: Option<EventBus>,
    shared: Vec<SharedRequirement>,
    provided: Vec<ProvidedLibrary>,
    fetch_timeout: Duration,
    event_buffer_size: usize,
    retry: RetryPolicy,
}

impl FederationBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remotes: BTreeMap::new(),
            fetcher: None,
            executor: None,
            catalog: None,
            scope: None,
            event_bus: None,
            shared: Vec::new(),
            provided: Vec::new(),
            fetch_timeout: Duration::from_secs(10),
            event_buffer_size: 100,
            retry: RetryPolicy::default(),
        }
    }

    /// Remotes, shared declarations and loader settings from `config`.
    pub fn config(mut self, config: &FederationConfig) -> std::result::Result<Self, ConfigError> {
        self.remotes.extend(config.remote_urls()?);
        self.shared.extend(config.shared_requirements()?);
        self.fetch_timeout = config.fetch_timeout();
        self.event_buffer_size = config.loader.event_buffer_size;
        self.retry = config.loader.retry.clone();
        Ok(self)
    }

    /// Add a remote whose manifest lives at `manifest_url`.
    pub fn remote(mut self, name: impl Into<String>, manifest_url: Url) -> Self {
        self.remotes.insert(name.into(), manifest_url);
        self
    }

    /// Override how manifests and entries are fetched (default: [`DefaultFetcher`]).
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Override how entries are executed (default: [`CatalogExecutor`] over the catalog).
    pub fn executor(mut self, executor: Arc<dyn EntryExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn catalog(mut self, catalog: Arc<ModuleCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Join an existing shared scope instead of creating one.
    ///
    /// Every bundle in one process should share the same scope.
    pub fn shared_scope(mut self, scope: Arc<SharedScope>) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size.max(1);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Declare a shared library this bundle requires.
    pub fn share(mut self, requirement: SharedRequirement) -> Self {
        self.shared.push(requirement);
        self
    }

    /// Contribute a loadable `version` of `library` to the shared scope.
    pub fn provide(
        mut self,
        library: impl Into<String>,
        version: Version,
        provider: Arc<dyn LibraryProvider>,
    ) -> Self {
        self.provided.push(ProvidedLibrary {
            library: library.into(),
            version,
            provider,
        });
        self
    }

    /// Build the federation
    pub fn build(self) -> Federation {
        let event_bus = self
            .event_bus
            .unwrap_or_else(|| EventBus::with_capacity(self.event_buffer_size));
        let scope = self
            .scope
            .unwrap_or_else(|| Arc::new(SharedScope::new().with_event_bus(event_bus.clone())));

        for requirement in self.shared {
            scope.declare_requirement(&self.name, requirement);
        }
        for provided in self.provided {
            scope.provide(provided.library, provided.version, self.name.clone(), provided.provider);
        }

        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(DefaultFetcher::new()));
        let catalog = self.catalog.unwrap_or_default();
        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(CatalogExecutor::new(Arc::clone(&catalog))));

        let resolver = ManifestResolver::new(self.remotes, Arc::clone(&fetcher), self.fetch_timeout);
        let loader = ModuleLoader::new(
            Arc::new(resolver),
            scope,
            fetcher,
            executor,
            self.fetch_timeout,
            Some(event_bus.clone()),
        );

        tracing::debug!(
            "Federation '{}' built with remotes [{}]",
            self.name,
            loader.resolver().remotes().collect::<Vec<_>>().join(", ")
        );

        Federation {
            name: self.name.into(),
            loader,
            catalog,
            event_bus,
            retry: self.retry,
        }
    }

    /// Build the federation and resolve eagerly shared singletons.
    pub async fn start(self) -> Federation {
        let federation = self.build();
        federation.resolve_eager().await;
        federation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FederationError;
    use crate::shared::InstanceHandle;

    #[tokio::test]
    async fn rejects_malformed_specifier() {
        let federation = Federation::builder("host").build();
        let err = federation.load("no-slash").await.unwrap_err();
        assert!(matches!(err, FederationError::InvalidSpecifier(_)));
        assert!(federation.request("").is_err());
    }

    #[tokio::test]
    async fn own_declarations_join_the_scope() {
        let federation = Federation::builder("host")
            .share(SharedRequirement::parse("ui-runtime", "^2.0.0").unwrap().singleton().eager())
            .provide(
                "ui-runtime",
                Version::new(2, 4, 0),
                Arc::new(|| Ok::<_, String>(InstanceHandle::new(42u32))),
            )
            .start()
            .await;

        let entry = federation.scope().resolved("ui-runtime").unwrap();
        assert_eq!(entry.resolved_version, Version::new(2, 4, 0));
        assert_eq!(entry.provided_by, "host");
        assert_eq!(federation.scope().requirements("ui-runtime")[0].requester, "host");
    }

    #[tokio::test]
    async fn config_supplies_remotes() {
        let config = FederationConfig::from_toml_str(
            "name = \"host\"\n[remotes.widgets]\nurl = \"https://widgets.example/mf-manifest.json\"\n",
        )
        .unwrap();
        let federation = Federation::builder("host").config(&config).unwrap().build();
        assert_eq!(
            federation.loader().resolver().manifest_url("widgets").map(Url::as_str),
            Some("https://widgets.example/mf-manifest.json")
        );
    }
}
