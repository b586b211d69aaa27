//! Backend services the host talks to.
pub mod product;

pub use product::{ProductListResponse, ProductService, ServiceError};
