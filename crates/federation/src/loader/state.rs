//! Per-module load state.
use std::fmt;

use tokio::sync::watch;

use crate::api::{FederationError, ModuleHandle, Result};

/// Key of one load: remote name plus normalized module path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleKey {
    pub remote: String,
    pub path: String,
}

impl ModuleKey {
    pub fn new(remote: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.remote, self.path.trim_start_matches("./"))
    }
}

/// Observable state of one module.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleLoadState {
    Unrequested,
    Loading,
    Ready(ModuleHandle),
    Failed(FederationError),
}

impl ModuleLoadState {
    pub fn is_settled(&self) -> bool {
        matches!(self, ModuleLoadState::Ready(_) | ModuleLoadState::Failed(_))
    }
}

/// Settled value broadcast to everyone attached to an attempt.
pub(crate) type Outcome = Option<Result<ModuleHandle>>;

pub(crate) enum Slot {
    Loading(watch::Receiver<Outcome>),
    Ready(ModuleHandle),
    Failed(FederationError),
}

impl Slot {
    pub(crate) fn observe(&self) -> ModuleLoadState {
        match self {
            Slot::Loading(_) => ModuleLoadState::Loading,
            Slot::Ready(handle) => ModuleLoadState::Ready(handle.clone()),
            Slot::Failed(err) => ModuleLoadState::Failed(err.clone()),
        }
    }

    pub(crate) fn settled(outcome: &Result<ModuleHandle>) -> Self {
        match outcome {
            Ok(handle) => Slot::Ready(handle.clone()),
            Err(err) => Slot::Failed(err.clone()),
        }
    }
}
