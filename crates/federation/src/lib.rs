//! Runtime module federation for independently deployed bundles.
//!
//! This crate lets one bundle load modules another bundle exposes, at runtime,
//! across a network boundary. Consumers build a [`Federation`] and request
//! modules as `remote/Module`; the remote's manifest is resolved, its shared
//! libraries negotiated, and its entry initialized on first use.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the [`Federation`] orchestrator and builder
//! - [`api`] exposes errors, specifiers and module handles
//! - [`manifest`] fetches and validates remote manifests
//! - [`shared`] negotiates singleton libraries between bundles
//! - [`loader`] loads modules with singleflight semantics and lazy results
//! - [`contract`] describes and checks the cross-bundle surface
//! - [`bridge`] shares host state with remotes as a narrow capability
//! - [`events`] provides a topic-based event bus
//! - [`fetch`] and [`config`] provide the network and configuration adapters
pub mod api;
pub mod bridge;
pub mod config;
pub mod contract;
pub mod events;
pub mod fetch;
pub mod loader;
pub mod manifest;
pub mod runtime;
pub mod shared;

pub use api::{
    Component, ConflictingRequirement, ErrorKind, Exports, FederationError, ModuleHandle,
    ModuleSpecifier, Result,
};
pub use bridge::{Action, Reducer, StateBridge, Store, Subscription};
pub use config::{ConfigError, Environment, FederationConfig};
pub use contract::{ContractExpectation, ContractSurface, SymbolShape};
pub use events::{Event, EventBus, ModuleEvent, SharedEvent, StateEvent, Topic};
pub use fetch::{DefaultFetcher, FetchError, Fetcher, StaticFetcher};
pub use loader::{
    CatalogExecutor, EntryExecutor, LazyModule, LoadStatus, ModuleCatalog, ModuleContext,
    ModuleLoadState, ModuleLoader, RemoteEntryDocument, RetryPolicy, SharedInstances, Suspense,
};
pub use manifest::{ManifestResolver, RemoteDescriptor, RemoteManifest, SharedDeclaration};
pub use runtime::{Federation, FederationBuilder};
pub use shared::{InstanceHandle, LibraryProvider, SharedRequirement, SharedScope, SingletonEntry};
