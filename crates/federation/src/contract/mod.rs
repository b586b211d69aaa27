//! Cross-app contract: versioned shapes of every symbol a bundle exposes.
//!
//! Both sides compile their own copy. The provider serves a
//! [`ContractSurface`] in its manifest; the consumer holds a
//! [`ContractExpectation`] and checks it at the boundary so a deployment skew
//! surfaces as a named `ContractMismatch` instead of a failure deep inside a
//! render.

mod shape;
mod surface;

pub use shape::SymbolShape;
pub use surface::{CONTRACT_VERSION_SYMBOL, ContractExpectation, ContractSurface};
