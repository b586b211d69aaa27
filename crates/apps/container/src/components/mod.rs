//! Components rendered by the host and exposed to remotes.
pub mod app;
pub mod button;
pub mod store_provider;

pub use app::App;
pub use button::{Button, ButtonProps, ButtonType, Rounded, Scale};
pub use store_provider::StoreProvider;
