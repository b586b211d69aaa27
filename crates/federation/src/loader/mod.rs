//! Dynamic module loading.
//!
//! [`ModuleLoader`] turns `remote/Module` requests into [`ModuleHandle`]s:
//! resolve the remote's manifest, negotiate its shared libraries, fetch and
//! initialize its entry once, then extract the requested module.
//!
//! # Singleflight
//!
//! Every `(remote, module)` key has at most one attempt in flight. The first
//! caller to find the key unrequested installs a `Loading` slot and spawns the
//! attempt; everyone else attaches to that slot's `watch` channel. The attempt
//! runs on its own task, so a caller that goes away never cancels it. Settled
//! states are cached until an explicit [`ModuleLoader::retry`].

mod container;
mod lazy;
mod retry;
mod state;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{OnceCell, watch};

pub use container::{
    CatalogExecutor, EntryExecutor, ModuleCatalog, ModuleContext, ModuleFactory, RemoteContainer,
    RemoteEntryDocument, SharedInstances,
};
pub use lazy::{LazyModule, LoadStatus, Suspense};
pub use retry::RetryPolicy;
pub use state::{ModuleKey, ModuleLoadState};

use self::state::{Outcome, Slot};
use crate::api::{FederationError, ModuleHandle, ModuleSpecifier, Result};
use crate::contract::ContractExpectation;
use crate::events::{Event, EventBus, ModuleEvent};
use crate::fetch::{FetchFailure, Fetcher, fetch_with_timeout};
use crate::manifest::{ManifestResolver, RemoteDescriptor, entry_digest};
use crate::shared::SharedScope;

type ContainerCell = Arc<OnceCell<Arc<RemoteContainer>>>;

/// Loads exposed modules of configured remotes.
///
/// Cheap to clone; clones share caches.
#[derive(Clone)]
pub struct ModuleLoader {
    inner: Arc<LoaderInner>,
}

struct LoaderInner {
    resolver: Arc<ManifestResolver>,
    scope: Arc<SharedScope>,
    fetcher: Arc<dyn Fetcher>,
    executor: Arc<dyn EntryExecutor>,
    fetch_timeout: Duration,
    event_bus: Option<EventBus>,
    slots: Mutex<HashMap<ModuleKey, Slot>>,
    containers: Mutex<HashMap<String, ContainerCell>>,
}

enum Begin {
    Settled(Result<ModuleHandle>),
    Attached(watch::Receiver<Outcome>),
    Leader(watch::Sender<Outcome>, watch::Receiver<Outcome>),
}

impl ModuleLoader {
    pub fn new(
        resolver: Arc<ManifestResolver>,
        scope: Arc<SharedScope>,
        fetcher: Arc<dyn Fetcher>,
        executor: Arc<dyn EntryExecutor>,
        fetch_timeout: Duration,
        event_bus: Option<EventBus>,
    ) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                resolver,
                scope,
                fetcher,
                executor,
                fetch_timeout,
                event_bus,
                slots: Mutex::new(HashMap::new()),
                containers: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn resolver(&self) -> &Arc<ManifestResolver> {
        &self.inner.resolver
    }

    pub fn scope(&self) -> &Arc<SharedScope> {
        &self.inner.scope
    }

    /// Load `module` of `remote`, suspending until it is ready or failed.
    pub async fn load(&self, remote: &str, module: &str) -> Result<ModuleHandle> {
        self.request(ModuleSpecifier::new(remote, module)).wait().await
    }

    /// Start loading `specifier` without waiting.
    ///
    /// Must be called from within a tokio runtime.
    pub fn request(&self, specifier: ModuleSpecifier) -> LazyModule {
        self.start(specifier, false)
    }

    /// Current state of `module` of `remote`. Never suspends.
    pub fn state(&self, remote: &str, module: &str) -> ModuleLoadState {
        let key = key_of(&ModuleSpecifier::new(remote, module));
        self.inner
            .slots
            .lock()
            .get(&key)
            .map_or(ModuleLoadState::Unrequested, Slot::observe)
    }

    /// Explicitly retry a failed load.
    ///
    /// A transient failure (unreachable fetch, timeout, aborted attempt)
    /// starts a new attempt. Other failures point at a deployment skew or a
    /// configuration problem and are returned as cached. Ready and in-flight
    /// loads behave as in [`ModuleLoader::load`].
    pub async fn retry(&self, remote: &str, module: &str) -> Result<ModuleHandle> {
        self.start(ModuleSpecifier::new(remote, module), true)
            .wait()
            .await
    }

    /// [`ModuleLoader::load`] followed by up to `policy.max_attempts - 1`
    /// retries of transient failures, sleeping with backoff in between.
    pub async fn load_with_retry(
        &self,
        remote: &str,
        module: &str,
        policy: &RetryPolicy,
    ) -> Result<ModuleHandle> {
        let mut outcome = self.load(remote, module).await;
        let mut attempt = 1;
        while let Err(err) = &outcome {
            if !err.is_retryable() || attempt >= policy.max_attempts {
                break;
            }
            let delay = policy.delay(attempt);
            tracing::warn!(
                "Loading {}/{} failed ({}); retrying in {:?}",
                remote,
                module,
                err,
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
            outcome = self.retry(remote, module).await;
        }
        outcome
    }

    /// Load after checking `expectation` against the remote's published
    /// contract. A mismatch fails before the entry is fetched.
    pub async fn load_checked(
        &self,
        remote: &str,
        module: &str,
        expectation: &ContractExpectation,
    ) -> Result<ModuleHandle> {
        let descriptor = self.inner.resolver.resolve(remote).await?;
        expectation.check(remote, &descriptor.contract)?;
        self.load(remote, module).await
    }

    fn start(&self, specifier: ModuleSpecifier, retry: bool) -> LazyModule {
        let key = key_of(&specifier);
        match self.inner.begin(&key, retry) {
            Begin::Settled(outcome) => LazyModule::settled(specifier, outcome),
            Begin::Attached(rx) => LazyModule::attached(specifier, rx),
            Begin::Leader(tx, rx) => {
                self.inner.publish(ModuleEvent::Loading {
                    remote: key.remote.clone(),
                    module: key.path.clone(),
                });
                let guard = AttemptGuard {
                    inner: Arc::clone(&self.inner),
                    key,
                    tx: Some(tx),
                };
                tokio::spawn(async move {
                    let outcome = guard.inner.attempt(&guard.key).await;
                    guard.complete(outcome);
                });
                LazyModule::attached(specifier, rx)
            }
        }
    }
}

impl LoaderInner {
    /// Lookup-or-attach, atomic under the slot lock.
    fn begin(&self, key: &ModuleKey, retry: bool) -> Begin {
        let mut slots = self.slots.lock();
        match slots.get(key) {
            Some(Slot::Ready(handle)) => return Begin::Settled(Ok(handle.clone())),
            Some(Slot::Loading(rx)) => return Begin::Attached(rx.clone()),
            Some(Slot::Failed(err)) if !(retry && err.is_retryable()) => {
                return Begin::Settled(Err(err.clone()));
            }
            _ => {}
        }

        let (tx, rx) = watch::channel(None);
        slots.insert(key.clone(), Slot::Loading(rx.clone()));
        Begin::Leader(tx, rx)
    }

    async fn attempt(&self, key: &ModuleKey) -> Result<ModuleHandle> {
        let descriptor = self.resolver.resolve(&key.remote).await?;
        let module_id = descriptor
            .module_id(&key.path)
            .ok_or_else(|| FederationError::ModuleNotFound {
                remote: key.remote.clone(),
                module: key.path.clone(),
            })?
            .to_string();

        let container = self.container(&descriptor).await?;
        let exports = container.get(&module_id)?;
        Ok(ModuleHandle::new(
            &key.remote,
            &key.path,
            module_id,
            descriptor.contract_version().clone(),
            descriptor.contract.symbol(&key.path).cloned(),
            exports,
        ))
    }

    /// Initialized container of `descriptor`'s remote, created at most once.
    async fn container(&self, descriptor: &RemoteDescriptor) -> Result<Arc<RemoteContainer>> {
        let cell = {
            let mut containers = self.containers.lock();
            Arc::clone(containers.entry(descriptor.name.clone()).or_default())
        };
        cell.get_or_try_init(|| self.initialize(descriptor))
            .await
            .map(Arc::clone)
    }

    async fn initialize(&self, descriptor: &RemoteDescriptor) -> Result<Arc<RemoteContainer>> {
        for requirement in &descriptor.shared {
            self.scope
                .declare_requirement(&descriptor.name, requirement.clone());
        }
        let mut shared = SharedInstances::default();
        for requirement in &descriptor.shared {
            let entry = self
                .scope
                .resolve_for(&descriptor.name, &requirement.library)
                .await?;
            shared.insert(entry);
        }

        let url = &descriptor.entry_location;
        tracing::debug!("Fetching entry for '{}' from {}", descriptor.name, url);
        let bytes = fetch_with_timeout(self.fetcher.as_ref(), url, self.fetch_timeout)
            .await
            .map_err(|failure| match failure {
                FetchFailure::Failed(err) => FederationError::EntryUnreachable {
                    remote: descriptor.name.clone(),
                    url: url.to_string(),
                    reason: err.to_string(),
                },
                FetchFailure::TimedOut => FederationError::Timeout {
                    remote: descriptor.name.clone(),
                    operation: "entry fetch",
                    timeout: self.fetch_timeout,
                },
            })?;

        if let Some(expected) = &descriptor.entry_integrity {
            let found = entry_digest(&bytes);
            if !found.eq_ignore_ascii_case(expected) {
                return Err(FederationError::IntegrityMismatch {
                    remote: descriptor.name.clone(),
                    expected: expected.clone(),
                    found,
                });
            }
        }

        let container = self.executor.execute(descriptor, &bytes, shared).await?;
        Ok(Arc::new(container))
    }

    fn publish(&self, event: ModuleEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(Event::Module(event));
        }
    }
}

/// Settles an attempt's slot exactly once.
///
/// Dropped without [`AttemptGuard::complete`] (the task panicked or the
/// runtime shut down), it settles the slot as aborted so waiters do not hang
/// and a retry can start over.
struct AttemptGuard {
    inner: Arc<LoaderInner>,
    key: ModuleKey,
    tx: Option<watch::Sender<Outcome>>,
}

impl AttemptGuard {
    fn complete(mut self, outcome: Result<ModuleHandle>) {
        self.settle(outcome);
    }

    fn settle(&mut self, outcome: Result<ModuleHandle>) {
        let Some(tx) = self.tx.take() else {
            return;
        };

        match &outcome {
            Ok(handle) => {
                tracing::info!("Module {} ready ({})", self.key, handle.module_id());
                self.inner.publish(ModuleEvent::Ready {
                    remote: self.key.remote.clone(),
                    module: self.key.path.clone(),
                    module_id: handle.module_id().to_string(),
                });
            }
            Err(err) => {
                tracing::warn!("Module {} failed: {}", self.key, err);
                self.inner.publish(ModuleEvent::Failed {
                    remote: self.key.remote.clone(),
                    module: self.key.path.clone(),
                    kind: err.kind(),
                    error: err.to_string(),
                });
            }
        }

        // Slot first, so anyone woken by the channel already sees the settled state.
        self.inner
            .slots
            .lock()
            .insert(self.key.clone(), Slot::settled(&outcome));
        tx.send_replace(Some(outcome));
    }
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        if self.tx.is_some() {
            let aborted = FederationError::LoadAborted(self.key.to_string());
            self.settle(Err(aborted));
        }
    }
}

fn key_of(specifier: &ModuleSpecifier) -> ModuleKey {
    ModuleKey::new(specifier.remote(), specifier.path())
}
