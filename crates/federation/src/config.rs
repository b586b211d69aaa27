//! Federation configuration structures and loaders.
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::loader::RetryPolicy;
use crate::shared::SharedRequirement;

/// Errors raised while loading or interpreting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown environment '{0}' (expected development or production)")]
    InvalidEnvironment(String),

    #[error("remote '{remote}' has no URL for {environment}")]
    MissingUrl {
        remote: String,
        environment: Environment,
    },

    #[error("remote '{remote}' has invalid URL '{url}': {source}")]
    InvalidUrl {
        remote: String,
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("shared library '{library}' has invalid version range '{range}': {source}")]
    InvalidRange {
        library: String,
        range: String,
        #[source]
        source: semver::Error,
    },
}

/// Deployment environment selecting which remote URLs apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
        }
    }
}

/// Manifest location of one remote.
///
/// `url` applies to every environment; `development` / `production` take
/// precedence in their environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub url: Option<String>,
    pub development: Option<String>,
    pub production: Option<String>,
}

impl RemoteConfig {
    pub fn url_for(&self, environment: Environment) -> Option<&str> {
        let specific = match environment {
            Environment::Development => self.development.as_deref(),
            Environment::Production => self.production.as_deref(),
        };
        specific.or(self.url.as_deref())
    }
}

/// A shared library this bundle declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedConfig {
    pub required_version: String,
    #[serde(default)]
    pub singleton: bool,
    #[serde(default)]
    pub eager: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub fetch_timeout_ms: u64,
    pub event_buffer_size: usize,
    pub retry: RetryPolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 10_000,
            event_buffer_size: 100,
            retry: RetryPolicy::default(),
        }
    }
}

/// Configuration of one bundle participating in the federation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FederationConfig {
    pub name: String,
    pub environment: Environment,
    pub remotes: BTreeMap<String, RemoteConfig>,
    pub shared: BTreeMap<String, SharedConfig>,
    /// Public module path → internal module id.
    pub exposes: BTreeMap<String, String>,
    pub loader: LoaderConfig,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            name: "app".to_string(),
            environment: Environment::default(),
            remotes: BTreeMap::new(),
            shared: BTreeMap::new(),
            exposes: BTreeMap::new(),
            loader: LoaderConfig::default(),
        }
    }
}

impl FederationConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `FEDERATION_CONFIG` - Path of a TOML config file (default: built-in defaults)
    /// - `FEDERATION_ENV` - `development` or `production`
    /// - `FEDERATION_FETCH_TIMEOUT_MS` - Manifest/entry fetch timeout
    /// - `FEDERATION_REMOTE_<NAME>` - Manifest URL override for remote `<name>`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match env::var("FEDERATION_CONFIG") {
            Ok(path) => Self::load(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides read through `lookup` (same keys as [`FederationConfig::from_env`]).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(environment) = lookup("FEDERATION_ENV") {
            self.environment = environment.parse()?;
        }

        if let Some(timeout) = read_var::<u64, _>(&lookup, "FEDERATION_FETCH_TIMEOUT_MS") {
            self.loader.fetch_timeout_ms = timeout.max(1);
        }

        for (name, remote) in &mut self.remotes {
            if let Some(url) = lookup(&remote_var(name)) {
                tracing::debug!("Remote '{}' overridden by environment: {}", name, url);
                *remote = RemoteConfig {
                    url: Some(url),
                    ..RemoteConfig::default()
                };
            }
        }
        Ok(())
    }

    /// Manifest URL of every remote in the active environment.
    pub fn remote_urls(&self) -> Result<BTreeMap<String, Url>, ConfigError> {
        self.remotes
            .iter()
            .map(|(name, remote)| {
                let raw = remote
                    .url_for(self.environment)
                    .ok_or_else(|| ConfigError::MissingUrl {
                        remote: name.clone(),
                        environment: self.environment,
                    })?;
                let url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
                    remote: name.clone(),
                    url: raw.to_string(),
                    source,
                })?;
                Ok((name.clone(), url))
            })
            .collect()
    }

    /// Shared libraries this bundle declares, with parsed ranges.
    pub fn shared_requirements(&self) -> Result<Vec<SharedRequirement>, ConfigError> {
        self.shared
            .iter()
            .map(|(library, shared)| {
                let mut requirement = SharedRequirement::parse(library.as_str(), &shared.required_version)
                    .map_err(|source| ConfigError::InvalidRange {
                        library: library.clone(),
                        range: shared.required_version.clone(),
                        source,
                    })?;
                requirement.singleton = shared.singleton;
                requirement.eager = shared.eager;
                Ok(requirement)
            })
            .collect()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.loader.fetch_timeout_ms)
    }
}

fn remote_var(name: &str) -> String {
    let suffix: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("FEDERATION_REMOTE_{}", suffix)
}

fn read_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    const CONTAINER_TOML: &str = r#"
name = "container"

[remotes.remote]
development = "http://localhost:3001/mf-manifest.json"
production = "https://remote.example.com/mf-manifest.json"

[shared.ui-runtime]
required_version = "^2.1.0"
singleton = true
eager = true

[exposes]
"./Button" = "buttonModule"

[loader]
fetch_timeout_ms = 2500

[loader.retry]
max_attempts = 5
"#;

    #[test]
    fn parses_bundle_config() {
        let config = FederationConfig::from_toml_str(CONTAINER_TOML).unwrap();
        assert_eq!(config.name, "container");
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.fetch_timeout(), Duration::from_millis(2500));
        assert_eq!(config.loader.retry.max_attempts, 5);
        assert_eq!(config.loader.event_buffer_size, 100);
        assert_eq!(config.exposes["./Button"], "buttonModule");

        let shared = config.shared_requirements().unwrap();
        assert_eq!(shared.len(), 1);
        assert!(shared[0].singleton && shared[0].eager);
    }

    #[test]
    fn selects_urls_per_environment() {
        let mut config = FederationConfig::from_toml_str(CONTAINER_TOML).unwrap();
        assert_eq!(
            config.remote_urls().unwrap()["remote"].as_str(),
            "http://localhost:3001/mf-manifest.json"
        );

        config.environment = Environment::Production;
        assert_eq!(
            config.remote_urls().unwrap()["remote"].as_str(),
            "https://remote.example.com/mf-manifest.json"
        );
    }

    #[test]
    fn overrides_apply_from_lookup() {
        let vars = HashMap::from([
            ("FEDERATION_ENV", "prod"),
            ("FEDERATION_FETCH_TIMEOUT_MS", "750"),
            ("FEDERATION_REMOTE_REMOTE", "file:///srv/remote/mf-manifest.json"),
        ]);
        let mut config = FederationConfig::from_toml_str(CONTAINER_TOML).unwrap();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.fetch_timeout(), Duration::from_millis(750));
        assert_eq!(
            config.remote_urls().unwrap()["remote"].as_str(),
            "file:///srv/remote/mf-manifest.json"
        );
    }

    #[test]
    fn rejects_unknown_environment() {
        let mut config = FederationConfig::default();
        let err = config
            .apply_overrides(|key| (key == "FEDERATION_ENV").then(|| "staging".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvironment(_)));
    }

    #[test]
    fn missing_url_is_reported() {
        let config = FederationConfig::from_toml_str(
            "name = \"remote\"\n[remotes.container]\ndevelopment = \"http://localhost:3000/mf-manifest.json\"\n",
        )
        .unwrap();
        let mut production = config.clone();
        production.environment = Environment::Production;
        assert!(config.remote_urls().is_ok());
        assert!(matches!(
            production.remote_urls(),
            Err(ConfigError::MissingUrl { .. })
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONTAINER_TOML.as_bytes()).unwrap();
        let config = FederationConfig::load(file.path()).unwrap();
        assert_eq!(config.name, "container");

        let err = FederationConfig::load(file.path().with_extension("missing")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn remote_var_names_are_uppercased() {
        assert_eq!(remote_var("ui-kit"), "FEDERATION_REMOTE_UI_KIT");
    }
}
