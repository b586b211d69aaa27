//! Two-part module specifiers (`remote/module`).
use std::fmt;
use std::str::FromStr;

use super::errors::FederationError;

/// A consumer-facing request for an exposed module, e.g. `widgets/Card`.
///
/// The module half is normalized to the manifest's public path form, so
/// `widgets/Card` and `widgets/./Card` both address `./Card`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleSpecifier {
    remote: String,
    path: String,
}

impl ModuleSpecifier {
    pub fn new(remote: impl Into<String>, module: &str) -> Self {
        Self {
            remote: remote.into(),
            path: normalize_module_path(module),
        }
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Public module path as declared in the manifest (`./Card`).
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl FromStr for ModuleSpecifier {
    type Err = FederationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (remote, module) = value
            .split_once('/')
            .ok_or_else(|| FederationError::InvalidSpecifier(value.to_string()))?;
        let module = module.trim_start_matches("./");
        if remote.is_empty() || module.is_empty() {
            return Err(FederationError::InvalidSpecifier(value.to_string()));
        }
        Ok(Self::new(remote, module))
    }
}

impl fmt::Display for ModuleSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.remote,
            self.path.trim_start_matches("./")
        )
    }
}

/// Converts `Card`, `./Card`, or `/Card` into the `./Card` form.
pub fn normalize_module_path(module: &str) -> String {
    let trimmed = module.trim().trim_start_matches("./").trim_start_matches('/');
    format!("./{}", trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_part_specifier() {
        let spec: ModuleSpecifier = "widgets/Card".parse().unwrap();
        assert_eq!(spec.remote(), "widgets");
        assert_eq!(spec.path(), "./Card");
        assert_eq!(spec.to_string(), "widgets/Card");
    }

    #[test]
    fn keeps_nested_module_paths() {
        let spec: ModuleSpecifier = "container/hooks/useStore".parse().unwrap();
        assert_eq!(spec.remote(), "container");
        assert_eq!(spec.path(), "./hooks/useStore");
    }

    #[test]
    fn rejects_specifier_without_module() {
        assert!(matches!(
            "widgets".parse::<ModuleSpecifier>(),
            Err(FederationError::InvalidSpecifier(_))
        ));
        assert!(matches!(
            "widgets/".parse::<ModuleSpecifier>(),
            Err(FederationError::InvalidSpecifier(_))
        ));
    }
}
