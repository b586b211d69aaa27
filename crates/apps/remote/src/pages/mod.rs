//! Pages exposed by this bundle.
pub mod test_page;

pub use test_page::TestPage;
