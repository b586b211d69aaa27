//! Remote bundle: pages built from the container's components.
//!
//! Exposes `./TestPage`, which renders `container/Button` in five variants, and
//! reads the container's store through [`store`]'s typed mirrors.
pub mod app;
pub mod bundle;
pub mod contract;
pub mod pages;
pub mod store;

pub use bundle::{NAME, RemoteBundle};
