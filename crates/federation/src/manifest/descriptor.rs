//! Validated, immutable view of a remote built from its manifest.
use std::collections::BTreeMap;

use semver::Version;
use url::Url;

use super::wire::{MANIFEST_SCHEMA_VERSION, RemoteManifest};
use crate::api::{FederationError, Result, normalize_module_path};
use crate::contract::ContractSurface;
use crate::shared::SharedRequirement;

/// Everything the loader needs to know about one remote.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDescriptor {
    pub name: String,
    pub manifest_url: Url,
    pub entry_location: Url,
    pub entry_integrity: Option<String>,
    /// Public module path (`./Card`) → internal module id (`cardModule`).
    pub exposed_modules: BTreeMap<String, String>,
    pub shared: Vec<SharedRequirement>,
    pub contract: ContractSurface,
}

impl RemoteDescriptor {
    /// Validates `manifest` fetched from `manifest_url` for the configured `remote`.
    pub fn from_manifest(remote: &str, manifest_url: &Url, manifest: RemoteManifest) -> Result<Self> {
        let malformed = |reason: String| FederationError::ManifestMalformed {
            remote: remote.to_string(),
            reason,
        };

        if manifest.schema_version != MANIFEST_SCHEMA_VERSION {
            return Err(malformed(format!(
                "unsupported schemaVersion {} (expected {})",
                manifest.schema_version, MANIFEST_SCHEMA_VERSION
            )));
        }
        if manifest.name != remote {
            return Err(malformed(format!(
                "manifest names remote '{}' but was configured as '{}'",
                manifest.name, remote
            )));
        }

        let entry_location = manifest_url
            .join(&manifest.entry)
            .map_err(|e| malformed(format!("invalid entry location '{}': {}", manifest.entry, e)))?;

        let contract_version = Version::parse(&manifest.contract_version).map_err(|e| {
            malformed(format!(
                "invalid contractVersion '{}': {}",
                manifest.contract_version, e
            ))
        })?;

        let mut exposed_modules = BTreeMap::new();
        for (path, module_id) in manifest.exposes {
            if module_id.trim().is_empty() {
                return Err(malformed(format!("exposed module '{}' has an empty id", path)));
            }
            if path.trim().trim_start_matches("./").is_empty() {
                return Err(malformed("exposed module path must not be empty".to_string()));
            }
            let normalized = normalize_module_path(&path);
            if exposed_modules.insert(normalized.clone(), module_id).is_some() {
                return Err(malformed(format!(
                    "exposed module '{}' is declared more than once",
                    normalized
                )));
            }
        }

        let shared = manifest
            .shared
            .iter()
            .map(|declaration| {
                SharedRequirement::try_from(declaration).map_err(|e| {
                    malformed(format!(
                        "shared library '{}' has invalid requiredVersion '{}': {}",
                        declaration.name, declaration.required_version, e
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let symbols = manifest
            .contract
            .into_iter()
            .map(|(path, shape)| (normalize_module_path(&path), shape))
            .collect();

        Ok(Self {
            name: manifest.name,
            manifest_url: manifest_url.clone(),
            entry_location,
            entry_integrity: manifest.entry_integrity,
            exposed_modules,
            shared,
            contract: ContractSurface {
                version: contract_version,
                symbols,
            },
        })
    }

    /// Internal id of an exposed module, accepting `Card` or `./Card`.
    pub fn module_id(&self, path: &str) -> Option<&str> {
        self.exposed_modules
            .get(&normalize_module_path(path))
            .map(String::as_str)
    }

    pub fn contract_version(&self) -> &Version {
        &self.contract.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::SymbolShape;
    use crate::manifest::SharedDeclaration;

    fn manifest_url() -> Url {
        Url::parse("https://widgets.example/assets/mf-manifest.json").unwrap()
    }

    fn manifest() -> RemoteManifest {
        let contract = ContractSurface::new(Version::new(1, 0, 0))
            .with_symbol("./Card", SymbolShape::component(["title"]));
        RemoteManifest::new("widgets", "remoteEntry.json", &contract)
            .expose("./Card", "cardModule")
            .share(SharedDeclaration {
                name: "ui-runtime".to_string(),
                required_version: "^2.1.0".to_string(),
                singleton: true,
                eager: false,
            })
    }

    #[test]
    fn resolves_entry_relative_to_manifest() {
        let descriptor =
            RemoteDescriptor::from_manifest("widgets", &manifest_url(), manifest()).unwrap();
        assert_eq!(
            descriptor.entry_location.as_str(),
            "https://widgets.example/assets/remoteEntry.json"
        );
        assert_eq!(descriptor.module_id("Card"), Some("cardModule"));
        assert_eq!(descriptor.module_id("./Card"), Some("cardModule"));
        assert_eq!(descriptor.module_id("./Missing"), None);
        assert_eq!(descriptor.shared[0].library, "ui-runtime");
        assert!(descriptor.contract.symbol("Card").is_some());
    }

    #[test]
    fn rejects_name_mismatch() {
        let err = RemoteDescriptor::from_manifest("gadgets", &manifest_url(), manifest())
            .unwrap_err();
        assert!(matches!(err, FederationError::ManifestMalformed { remote, .. } if remote == "gadgets"));
    }

    #[test]
    fn rejects_unparseable_ranges() {
        let mut manifest = manifest();
        manifest.shared[0].required_version = "not-a-range".to_string();
        let err = RemoteDescriptor::from_manifest("widgets", &manifest_url(), manifest)
            .unwrap_err();
        assert!(matches!(err, FederationError::ManifestMalformed { .. }));
    }

    #[test]
    fn rejects_unknown_schema() {
        let mut manifest = manifest();
        manifest.schema_version = 7;
        assert!(RemoteDescriptor::from_manifest("widgets", &manifest_url(), manifest).is_err());
    }

    #[test]
    fn rejects_paths_exposed_twice() {
        let mut manifest = manifest();
        manifest
            .exposes
            .insert("Card".to_string(), "legacyCardModule".to_string());
        let err = RemoteDescriptor::from_manifest("widgets", &manifest_url(), manifest)
            .unwrap_err();
        assert!(
            matches!(err, FederationError::ManifestMalformed { ref reason, .. } if reason.contains("./Card"))
        );
    }

    #[test]
    fn rejects_empty_module_id() {
        let manifest = manifest().expose("./Empty", "");
        assert!(RemoteDescriptor::from_manifest("widgets", &manifest_url(), manifest).is_err());
    }
}
