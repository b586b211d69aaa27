//! Shared library negotiation between bundles.

mod requirement;
mod scope;

pub use requirement::{InstanceHandle, LibraryProvider, SharedRequirement, SingletonEntry};
pub use scope::{DeclaredRequirement, SharedScope};
