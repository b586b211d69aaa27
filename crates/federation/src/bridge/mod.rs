//! Host state shared with remote bundles.
//!
//! The host owns a [`Store`]; remotes get a [`StateBridge`] and can only read
//! snapshots, subscribe, and dispatch [`Action`]s.

mod action;
mod store;

pub use action::Action;
pub use store::{Reducer, StateBridge, Store, Subscription};
