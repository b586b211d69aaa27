//! Event payloads published on the federation bus.
use serde::Serialize;

use crate::api::ErrorKind;

/// Module load lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModuleEvent {
    Loading {
        remote: String,
        module: String,
    },
    Ready {
        remote: String,
        module: String,
        module_id: String,
    },
    Failed {
        remote: String,
        module: String,
        #[serde(serialize_with = "serialize_kind")]
        kind: ErrorKind,
        error: String,
    },
}

/// Shared scope resolutions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SharedEvent {
    Resolved {
        library: String,
        version: String,
        provided_by: String,
    },
    Conflict {
        library: String,
        error: String,
    },
}

/// Accepted transitions of a shared state container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateEvent {
    pub action: String,
    pub revision: u64,
}

fn serialize_kind<S: serde::Serializer>(kind: &ErrorKind, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(kind)
}
