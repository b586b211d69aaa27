//! Shared library requirements and resolved instances.
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use semver::{Version, VersionReq};

use crate::manifest::SharedDeclaration;

/// A bundle's declared need for a shared library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedRequirement {
    pub library: String,
    pub required_version: VersionReq,
    /// Only one instance may exist per process.
    pub singleton: bool,
    /// Resolve at startup instead of on first module load.
    pub eager: bool,
}

impl SharedRequirement {
    pub fn new(library: impl Into<String>, required_version: VersionReq) -> Self {
        Self {
            library: library.into(),
            required_version,
            singleton: false,
            eager: false,
        }
    }

    pub fn parse(library: impl Into<String>, range: &str) -> Result<Self, semver::Error> {
        Ok(Self::new(library, VersionReq::parse(range)?))
    }

    pub fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    pub fn eager(mut self) -> Self {
        self.eager = true;
        self
    }

    pub fn to_declaration(&self) -> SharedDeclaration {
        SharedDeclaration {
            name: self.library.clone(),
            required_version: self.required_version.to_string(),
            singleton: self.singleton,
            eager: self.eager,
        }
    }
}

impl TryFrom<&SharedDeclaration> for SharedRequirement {
    type Error = semver::Error;

    fn try_from(declaration: &SharedDeclaration) -> Result<Self, Self::Error> {
        Ok(Self {
            library: declaration.name.clone(),
            required_version: VersionReq::parse(&declaration.required_version)?,
            singleton: declaration.singleton,
            eager: declaration.eager,
        })
    }
}

/// Opaque reference to a loaded library instance.
#[derive(Clone)]
pub struct InstanceHandle(Arc<dyn Any + Send + Sync>);

impl InstanceHandle {
    pub fn new<T: Any + Send + Sync>(instance: T) -> Self {
        Self(Arc::new(instance))
    }

    pub fn from_arc<T: Any + Send + Sync>(instance: Arc<T>) -> Self {
        Self(instance)
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.0).downcast::<T>().ok()
    }

    pub fn ptr_eq(&self, other: &InstanceHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceHandle({:p})", Arc::as_ptr(&self.0))
    }
}

/// A resolved shared library: the version picked and the instance every
/// singleton requester observes.
#[derive(Debug, Clone)]
pub struct SingletonEntry {
    pub library: String,
    pub resolved_version: Version,
    pub instance: InstanceHandle,
    /// Bundle that contributed the selected version.
    pub provided_by: String,
}

/// A bundle's contribution of one loadable library version.
#[async_trait]
pub trait LibraryProvider: Send + Sync {
    async fn instantiate(&self) -> Result<InstanceHandle, String>;
}

#[async_trait]
impl<F> LibraryProvider for F
where
    F: Fn() -> Result<InstanceHandle, String> + Send + Sync,
{
    async fn instantiate(&self) -> Result<InstanceHandle, String> {
        self()
    }
}
