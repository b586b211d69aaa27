//! Unified error types surfaced by the federation API.
//!
//! Every failure a consumer can observe from the loader, resolver, or shared
//! scope is a [`FederationError`]. Errors are `Clone` because a single settled
//! load is observed by every caller that attached to it.
use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FederationError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FederationError {
    #[error("no remote named '{0}' is configured")]
    UnknownRemote(String),

    #[error("invalid module specifier '{0}': expected 'remote/module'")]
    InvalidSpecifier(String),

    #[error("remote '{remote}' does not expose module '{module}'")]
    ModuleNotFound { remote: String, module: String },

    #[error("manifest for '{remote}' unreachable at {url}: {reason}")]
    ManifestUnreachable {
        remote: String,
        url: String,
        reason: String,
    },

    #[error("entry for '{remote}' unreachable at {url}: {reason}")]
    EntryUnreachable {
        remote: String,
        url: String,
        reason: String,
    },

    #[error("manifest for '{remote}' is malformed: {reason}")]
    ManifestMalformed { remote: String, reason: String },

    #[error("entry for '{remote}' is malformed: {reason}")]
    EntryMalformed { remote: String, reason: String },

    #[error("entry for '{remote}' failed integrity check: expected {expected}, found {found}")]
    IntegrityMismatch {
        remote: String,
        expected: String,
        found: String,
    },

    #[error("contract mismatch for '{remote}' symbol '{symbol}': expected {expected}, found {found}")]
    ContractMismatch {
        remote: String,
        symbol: String,
        expected: String,
        found: String,
    },

    #[error("shared dependency conflict for '{library}': no single version satisfies {}", RequirementList(.requirements))]
    SharedDependencyConflict {
        library: String,
        requirements: Vec<ConflictingRequirement>,
    },

    #[error("no loadable version of shared library '{0}' was provided")]
    SharedLibraryUnavailable(String),

    #[error("shared library '{library}' failed to instantiate: {reason}")]
    SharedInstantiation { library: String, reason: String },

    #[error("{operation} for '{remote}' timed out after {timeout:?}")]
    Timeout {
        remote: String,
        operation: &'static str,
        timeout: Duration,
    },

    #[error("load of '{0}' was aborted before it settled")]
    LoadAborted(String),
}

/// One requester and the range it declared, reported on a version conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictingRequirement {
    pub requester: String,
    pub range: String,
}

impl fmt::Display for ConflictingRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} requires {}", self.requester, self.range)
    }
}

struct RequirementList<'a>(&'a [ConflictingRequirement]);

impl fmt::Display for RequirementList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, requirement) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", requirement)?;
        }
        Ok(())
    }
}

/// Operator-facing classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network trouble; safe to retry.
    Transient,
    /// Host and remote disagree about what was deployed; redeploy, do not retry.
    DeploymentSkew,
    /// The request names something this process was never configured with.
    Configuration,
    /// Shared library requirements cannot be reconciled.
    Conflict,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Transient => "transient",
            ErrorKind::DeploymentSkew => "deployment-skew",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Conflict => "conflict",
        };
        write!(f, "{}", label)
    }
}

impl FederationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FederationError::ManifestUnreachable { .. }
            | FederationError::EntryUnreachable { .. }
            | FederationError::Timeout { .. }
            | FederationError::LoadAborted(_) => ErrorKind::Transient,
            FederationError::ManifestMalformed { .. }
            | FederationError::EntryMalformed { .. }
            | FederationError::IntegrityMismatch { .. }
            | FederationError::ContractMismatch { .. }
            | FederationError::ModuleNotFound { .. } => ErrorKind::DeploymentSkew,
            FederationError::UnknownRemote(_) | FederationError::InvalidSpecifier(_) => {
                ErrorKind::Configuration
            }
            FederationError::SharedDependencyConflict { .. }
            | FederationError::SharedLibraryUnavailable(_)
            | FederationError::SharedInstantiation { .. } => ErrorKind::Conflict,
        }
    }

    /// Whether an explicit caller-initiated retry may start a new attempt.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_names_every_requester() {
        let err = FederationError::SharedDependencyConflict {
            library: "ui-runtime".to_string(),
            requirements: vec![
                ConflictingRequirement {
                    requester: "container".to_string(),
                    range: "^2.0.0".to_string(),
                },
                ConflictingRequirement {
                    requester: "remote".to_string(),
                    range: "^3.0.0".to_string(),
                },
            ],
        };

        let message = err.to_string();
        assert!(message.contains("container requires ^2.0.0"));
        assert!(message.contains("remote requires ^3.0.0"));
    }

    #[test]
    fn only_network_failures_are_retryable() {
        let timeout = FederationError::Timeout {
            remote: "widgets".to_string(),
            operation: "manifest fetch",
            timeout: Duration::from_millis(10),
        };
        assert!(timeout.is_retryable());

        let malformed = FederationError::ManifestMalformed {
            remote: "widgets".to_string(),
            reason: "bad json".to_string(),
        };
        assert!(!malformed.is_retryable());
        assert_eq!(malformed.kind(), ErrorKind::DeploymentSkew);

        let unknown = FederationError::UnknownRemote("nope".to_string());
        assert_eq!(unknown.kind(), ErrorKind::Configuration);
    }
}
