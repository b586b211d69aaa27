//! Container bundle: the host application.
//!
//! Owns the authoritative [`Store`](federation::Store) and exposes to remotes
//! its button, store hooks, state types and store provider. The host page
//! embeds `remote/TestPage` behind a loading fallback.
pub mod bundle;
pub mod components;
pub mod contract;
pub mod hooks;
pub mod services;
pub mod state;

pub use bundle::{ContainerBundle, NAME};
pub use hooks::{StoreActions, StoreHooks};
pub use state::{HostReducer, HostState};
