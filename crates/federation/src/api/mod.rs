//! Public federation API surface.
//!
//! This module gathers the types exposed to consumers of the federation crate
//! so the loader, resolver, and shared scope can stay focused on mechanics.

pub mod errors;
pub mod handle;
pub mod specifier;

pub use errors::{ConflictingRequirement, ErrorKind, FederationError, Result};
pub use handle::{Component, Exports, ModuleHandle};
pub use specifier::{ModuleSpecifier, normalize_module_path};
