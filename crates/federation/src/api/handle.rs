//! Handles to loaded remote modules.
//!
//! A [`ModuleHandle`] is what a settled load hands back to every caller that
//! asked for the same module. Clones share one allocation, so "the same
//! module" can be checked with [`ModuleHandle::ptr_eq`].
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use semver::Version;
use serde_json::Value;

use super::errors::{FederationError, Result};
use crate::contract::SymbolShape;

/// A renderable unit exported across the bundle boundary.
///
/// Props arrive as JSON because the consumer was not compiled against the
/// provider's prop types; the shape is governed by the contract instead.
pub trait Component: Send + Sync {
    fn render(&self, props: &Value) -> String;
}

/// What an exposed module evaluates to once initialized.
#[derive(Clone)]
pub enum Exports {
    Component(Arc<dyn Component>),
    Value(Arc<dyn Any + Send + Sync>),
}

impl Exports {
    pub fn component(component: impl Component + 'static) -> Self {
        Exports::Component(Arc::new(component))
    }

    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Exports::Value(Arc::new(value))
    }

    fn label(&self) -> &'static str {
        match self {
            Exports::Component(_) => "component",
            Exports::Value(_) => "value",
        }
    }
}

impl fmt::Debug for Exports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Exports::{}", self.label())
    }
}

struct ModuleInner {
    remote: String,
    path: String,
    module_id: String,
    contract_version: Version,
    shape: Option<SymbolShape>,
    exports: Exports,
}

/// Cloneable reference to a module that reached the Ready state.
#[derive(Clone)]
pub struct ModuleHandle {
    inner: Arc<ModuleInner>,
}

impl ModuleHandle {
    pub(crate) fn new(
        remote: impl Into<String>,
        path: impl Into<String>,
        module_id: impl Into<String>,
        contract_version: Version,
        shape: Option<SymbolShape>,
        exports: Exports,
    ) -> Self {
        Self {
            inner: Arc::new(ModuleInner {
                remote: remote.into(),
                path: path.into(),
                module_id: module_id.into(),
                contract_version,
                shape,
                exports,
            }),
        }
    }

    pub fn remote(&self) -> &str {
        &self.inner.remote
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Internal identifier the remote's entry knows this module by.
    pub fn module_id(&self) -> &str {
        &self.inner.module_id
    }

    pub fn contract_version(&self) -> &Version {
        &self.inner.contract_version
    }

    /// Declared shape of this module in the remote's contract, if any.
    pub fn shape(&self) -> Option<&SymbolShape> {
        self.inner.shape.as_ref()
    }

    pub fn exports(&self) -> &Exports {
        &self.inner.exports
    }

    /// Returns the exported component or a `ContractMismatch` if the module
    /// exports something else.
    pub fn component(&self) -> Result<Arc<dyn Component>> {
        match &self.inner.exports {
            Exports::Component(component) => Ok(Arc::clone(component)),
            other => Err(self.mismatch("component", other.label())),
        }
    }

    /// Downcasts a value export to `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        match &self.inner.exports {
            Exports::Value(value) => Arc::clone(value)
                .downcast::<T>()
                .map_err(|_| self.mismatch(std::any::type_name::<T>(), "value of another type")),
            other => Err(self.mismatch(std::any::type_name::<T>(), other.label())),
        }
    }

    pub fn ptr_eq(&self, other: &ModuleHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn mismatch(&self, expected: &str, found: &str) -> FederationError {
        FederationError::ContractMismatch {
            remote: self.inner.remote.clone(),
            symbol: self.inner.path.clone(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

impl PartialEq for ModuleHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("remote", &self.inner.remote)
            .field("path", &self.inner.path)
            .field("module_id", &self.inner.module_id)
            .field("contract_version", &self.inner.contract_version.to_string())
            .field("exports", &self.inner.exports)
            .finish()
    }
}
