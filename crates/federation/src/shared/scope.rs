//! Shared scope: the process-wide singleton registry.
//!
//! # Design
//!
//! - **Requirements**: every bundle declares the ranges it accepts
//! - **Providers**: every bundle may contribute a loadable version
//! - **Singletons**: one `OnceCell` per library, filled at most once
//!
//! Selection happens under the scope lock; instantiation happens outside it
//! inside the library's cell, so concurrent resolvers of the same library
//! share one instantiation while other libraries proceed independently.
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::Mutex;
use semver::Version;
use tokio::sync::OnceCell;

use super::requirement::{LibraryProvider, SharedRequirement, SingletonEntry};
use crate::api::{ConflictingRequirement, FederationError, Result};
use crate::events::{Event, EventBus, SharedEvent};

/// A requirement together with the bundle that declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredRequirement {
    pub requester: String,
    pub requirement: SharedRequirement,
}

#[derive(Clone)]
struct ProvidedVersion {
    version: Version,
    provided_by: String,
    provider: Arc<dyn LibraryProvider>,
}

#[derive(Default)]
struct ScopeState {
    requirements: BTreeMap<String, Vec<DeclaredRequirement>>,
    providers: BTreeMap<String, Vec<ProvidedVersion>>,
    singletons: BTreeMap<String, Arc<OnceCell<SingletonEntry>>>,
}

impl ScopeState {
    fn is_singleton(&self, library: &str) -> bool {
        self.requirements
            .get(library)
            .is_some_and(|reqs| reqs.iter().any(|r| r.requirement.singleton))
    }

    fn declared(&self, library: &str) -> &[DeclaredRequirement] {
        self.requirements
            .get(library)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Highest provided version accepted by every requirement in `reqs`.
    fn select(&self, library: &str, reqs: &[DeclaredRequirement]) -> Result<ProvidedVersion> {
        let provided = self
            .providers
            .get(library)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| FederationError::SharedLibraryUnavailable(library.to_string()))?;

        provided
            .iter()
            .filter(|candidate| {
                reqs.iter()
                    .all(|r| r.requirement.required_version.matches(&candidate.version))
            })
            .max_by(|a, b| a.version.cmp(&b.version))
            .cloned()
            .ok_or_else(|| conflict(library, reqs))
    }
}

fn conflict(library: &str, reqs: &[DeclaredRequirement]) -> FederationError {
    FederationError::SharedDependencyConflict {
        library: library.to_string(),
        requirements: reqs
            .iter()
            .map(|r| ConflictingRequirement {
                requester: r.requester.clone(),
                range: r.requirement.required_version.to_string(),
            })
            .collect(),
    }
}

/// Registry ensuring one instance per singleton library.
///
/// Owned by whoever builds the federation (usually one per process) and
/// shared by every bundle in it; tests build one per case.
pub struct SharedScope {
    state: Mutex<ScopeState>,
    event_bus: Option<EventBus>,
}

impl SharedScope {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ScopeState::default()),
            event_bus: None,
        }
    }

    /// Publish resolutions and conflicts on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Record that `requester` needs `requirement`. Loads nothing.
    ///
    /// Re-declaring an identical requirement is a no-op.
    pub fn declare_requirement(&self, requester: &str, requirement: SharedRequirement) {
        let declared = DeclaredRequirement {
            requester: requester.to_string(),
            requirement,
        };
        let mut state = self.state.lock();
        let entries = state
            .requirements
            .entry(declared.requirement.library.clone())
            .or_default();
        if !entries.contains(&declared) {
            tracing::debug!(
                "{} declares {}@{}{}",
                declared.requester,
                declared.requirement.library,
                declared.requirement.required_version,
                if declared.requirement.singleton { " (singleton)" } else { "" }
            );
            entries.push(declared);
        }
    }

    /// Offer a loadable `version` of `library` contributed by `provided_by`.
    pub fn provide(
        &self,
        library: impl Into<String>,
        version: Version,
        provided_by: impl Into<String>,
        provider: Arc<dyn LibraryProvider>,
    ) {
        let library = library.into();
        let provided_by = provided_by.into();
        tracing::debug!("{} provides {}@{}", provided_by, library, version);
        self.state
            .lock()
            .providers
            .entry(library)
            .or_default()
            .push(ProvidedVersion {
                version,
                provided_by,
                provider,
            });
    }

    /// Requirements declared so far for `library`.
    pub fn requirements(&self, library: &str) -> Vec<DeclaredRequirement> {
        self.state.lock().declared(library).to_vec()
    }

    /// Resolved singleton, if `library` has already been resolved.
    pub fn resolved(&self, library: &str) -> Option<SingletonEntry> {
        self.state
            .lock()
            .singletons
            .get(library)
            .and_then(|cell| cell.get().cloned())
    }

    /// Resolve `library` against every declared range.
    ///
    /// For singletons the first successful call picks the highest provided
    /// version satisfying all ranges and instantiates it; later calls return
    /// the cached entry. Non-singleton libraries get a fresh instance.
    pub async fn resolve(&self, library: &str) -> Result<SingletonEntry> {
        let outcome = self.resolve_inner(library, None).await;
        self.publish(library, &outcome);
        outcome
    }

    /// Resolve `library` on behalf of `requester`.
    ///
    /// Once a singleton is resolved, only `requester`'s own ranges are checked
    /// against the cached version, so a late incompatible declaration from
    /// another bundle fails that bundle alone. Other libraries are
    /// instantiated per requester from the highest version satisfying that
    /// requester's own ranges.
    pub async fn resolve_for(&self, requester: &str, library: &str) -> Result<SingletonEntry> {
        let outcome = self.resolve_inner(library, Some(requester)).await;
        self.publish(library, &outcome);
        outcome
    }

    /// Resolve every singleton library that some bundle marked eager.
    ///
    /// Failures are reported per library; one conflict does not stop the rest.
    pub async fn resolve_eager(&self) -> Vec<(String, Result<SingletonEntry>)> {
        let eager: BTreeSet<String> = {
            let state = self.state.lock();
            state
                .requirements
                .iter()
                .filter(|(library, reqs)| {
                    state.is_singleton(library) && reqs.iter().any(|r| r.requirement.eager)
                })
                .map(|(library, _)| library.clone())
                .collect()
        };

        let mut outcomes = Vec::with_capacity(eager.len());
        for library in eager {
            let outcome = self.resolve(&library).await;
            outcomes.push((library, outcome));
        }
        outcomes
    }

    async fn resolve_inner(&self, library: &str, requester: Option<&str>) -> Result<SingletonEntry> {
        enum Plan {
            Cached(SingletonEntry),
            Singleton(Arc<OnceCell<SingletonEntry>>, ProvidedVersion),
            Fresh(ProvidedVersion),
        }

        let plan = {
            let mut state = self.state.lock();
            let all = state.declared(library).to_vec();

            if state.is_singleton(library) {
                let cell = Arc::clone(state.singletons.entry(library.to_string()).or_default());
                match cell.get().cloned() {
                    Some(entry) => {
                        // The instance already handed out is never replaced.
                        // A requester is only refused when its own ranges
                        // miss the cached version.
                        let satisfied = all
                            .iter()
                            .filter(|r| requester.is_none_or(|name| r.requester == name))
                            .all(|r| r.requirement.required_version.matches(&entry.resolved_version));
                        if !satisfied {
                            return Err(conflict(library, &all));
                        }
                        Plan::Cached(entry)
                    }
                    None => Plan::Singleton(cell, state.select(library, &all)?),
                }
            } else {
                let scoped: Vec<_> = match requester {
                    Some(requester) => all
                        .iter()
                        .filter(|r| r.requester == requester)
                        .cloned()
                        .collect(),
                    None => all,
                };
                Plan::Fresh(state.select(library, &scoped)?)
            }
        };

        match plan {
            Plan::Cached(entry) => {
                tracing::trace!("Shared scope cache hit for '{}'", library);
                Ok(entry)
            }
            Plan::Singleton(cell, selected) => cell
                .get_or_try_init(|| instantiate(library, selected))
                .await
                .cloned(),
            Plan::Fresh(selected) => instantiate(library, selected).await,
        }
    }

    fn publish(&self, library: &str, outcome: &Result<SingletonEntry>) {
        let Some(bus) = &self.event_bus else {
            return;
        };
        let event = match outcome {
            Ok(entry) => SharedEvent::Resolved {
                library: entry.library.clone(),
                version: entry.resolved_version.to_string(),
                provided_by: entry.provided_by.clone(),
            },
            Err(err) => SharedEvent::Conflict {
                library: library.to_string(),
                error: err.to_string(),
            },
        };
        bus.publish(Event::Shared(event));
    }
}

impl Default for SharedScope {
    fn default() -> Self {
        Self::new()
    }
}

async fn instantiate(library: &str, selected: ProvidedVersion) -> Result<SingletonEntry> {
    let instance = selected
        .provider
        .instantiate()
        .await
        .map_err(|reason| FederationError::SharedInstantiation {
            library: library.to_string(),
            reason,
        })?;

    tracing::info!(
        "Shared library {}@{} instantiated (provided by {})",
        library,
        selected.version,
        selected.provided_by
    );

    Ok(SingletonEntry {
        library: library.to_string(),
        resolved_version: selected.version,
        instance,
        provided_by: selected.provided_by,
    })
}
