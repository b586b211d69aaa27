//! Versioned contract surfaces and consumer-side expectations.
use std::collections::BTreeMap;

use semver::{Version, VersionReq};

use super::SymbolShape;
use crate::api::{FederationError, Result, normalize_module_path};

/// Symbol name (public module path) reported when the contract version itself
/// is what disagrees.
pub const CONTRACT_VERSION_SYMBOL: &str = "<contract version>";

/// What a bundle declares it exposes, served alongside its manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSurface {
    pub version: Version,
    pub symbols: BTreeMap<String, SymbolShape>,
}

impl ContractSurface {
    pub fn new(version: Version) -> Self {
        Self {
            version,
            symbols: BTreeMap::new(),
        }
    }

    pub fn with_symbol(mut self, path: &str, shape: SymbolShape) -> Self {
        self.symbols.insert(normalize_module_path(path), shape);
        self
    }

    pub fn symbol(&self, path: &str) -> Option<&SymbolShape> {
        self.symbols.get(&normalize_module_path(path))
    }
}

/// A consumer's own, independently compiled copy of a provider's contract.
///
/// Only the symbols the consumer actually uses need to be listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractExpectation {
    pub version: VersionReq,
    pub symbols: BTreeMap<String, SymbolShape>,
}

impl ContractExpectation {
    pub fn new(version: VersionReq) -> Self {
        Self {
            version,
            symbols: BTreeMap::new(),
        }
    }

    pub fn expect(mut self, path: &str, shape: SymbolShape) -> Self {
        self.symbols.insert(normalize_module_path(path), shape);
        self
    }

    /// Checks the whole expectation against what `remote` serves.
    pub fn check(&self, remote: &str, surface: &ContractSurface) -> Result<()> {
        self.check_version(remote, surface)?;
        for (path, expected) in &self.symbols {
            check_symbol(remote, path, expected, surface.symbols.get(path))?;
        }
        Ok(())
    }

    /// Checks the version and a single symbol; used right after loading one module.
    pub fn check_symbol(&self, remote: &str, path: &str, surface: &ContractSurface) -> Result<()> {
        self.check_version(remote, surface)?;
        let path = normalize_module_path(path);
        match self.symbols.get(&path) {
            Some(expected) => check_symbol(remote, &path, expected, surface.symbols.get(&path)),
            None => Ok(()),
        }
    }

    fn check_version(&self, remote: &str, surface: &ContractSurface) -> Result<()> {
        if self.version.matches(&surface.version) {
            return Ok(());
        }
        Err(FederationError::ContractMismatch {
            remote: remote.to_string(),
            symbol: CONTRACT_VERSION_SYMBOL.to_string(),
            expected: self.version.to_string(),
            found: surface.version.to_string(),
        })
    }
}

fn check_symbol(
    remote: &str,
    path: &str,
    expected: &SymbolShape,
    provided: Option<&SymbolShape>,
) -> Result<()> {
    match provided {
        Some(provided) if provided.satisfies(expected) => Ok(()),
        Some(provided) => Err(FederationError::ContractMismatch {
            remote: remote.to_string(),
            symbol: path.to_string(),
            expected: expected.to_string(),
            found: provided.to_string(),
        }),
        None => Err(FederationError::ContractMismatch {
            remote: remote.to_string(),
            symbol: path.to_string(),
            expected: expected.to_string(),
            found: "absent".to_string(),
        }),
    }
}
