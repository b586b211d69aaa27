//! JSON wire format of a remote manifest (`mf-manifest.json`).
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::api::normalize_module_path;
use crate::contract::{ContractSurface, SymbolShape};

/// Manifest schema understood by this crate.
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// Conventional file name of a manifest next to a deployed bundle.
pub const MANIFEST_FILE_NAME: &str = "mf-manifest.json";

/// Manifest as served by a remote deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteManifest {
    pub schema_version: u32,
    pub name: String,
    /// Entry document location, relative to the manifest URL or absolute.
    pub entry: String,
    /// Hex sha256 of the entry document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_integrity: Option<String>,
    pub contract_version: String,
    #[serde(default)]
    pub exposes: BTreeMap<String, String>,
    #[serde(default)]
    pub shared: Vec<SharedDeclaration>,
    #[serde(default)]
    pub contract: BTreeMap<String, SymbolShape>,
}

/// One shared-library requirement as declared on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedDeclaration {
    pub name: String,
    pub required_version: String,
    #[serde(default)]
    pub singleton: bool,
    #[serde(default)]
    pub eager: bool,
}

impl RemoteManifest {
    /// Starts a manifest for a bundle serving `contract`.
    pub fn new(name: impl Into<String>, entry: impl Into<String>, contract: &ContractSurface) -> Self {
        Self {
            schema_version: MANIFEST_SCHEMA_VERSION,
            name: name.into(),
            entry: entry.into(),
            entry_integrity: None,
            contract_version: contract.version.to_string(),
            exposes: BTreeMap::new(),
            shared: Vec::new(),
            contract: contract.symbols.clone(),
        }
    }

    pub fn expose(mut self, path: &str, module_id: impl Into<String>) -> Self {
        self.exposes
            .insert(normalize_module_path(path), module_id.into());
        self
    }

    pub fn share(mut self, declaration: SharedDeclaration) -> Self {
        self.shared.push(declaration);
        self
    }

    /// Pins the entry document this manifest was published with.
    pub fn with_entry_integrity(mut self, entry: &[u8]) -> Self {
        self.entry_integrity = Some(entry_digest(entry));
        self
    }

    pub fn parse(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Hex sha256 digest used for `entryIntegrity`.
pub fn entry_digest(entry: &[u8]) -> String {
    hex::encode(Sha256::digest(entry))
}
