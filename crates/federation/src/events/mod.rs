//! Topic-based event bus for federation events.
//!
//! Loader, shared scope, and state containers publish to specific topics;
//! consumers (logging, a UI status bar, tests) subscribe only to what they need.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::{ModuleEvent, SharedEvent, StateEvent};
