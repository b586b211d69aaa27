//! Shell subcommands.
mod publish;
mod run;

pub use publish::{Publish, Published, publish_all};
pub use run::Run;
