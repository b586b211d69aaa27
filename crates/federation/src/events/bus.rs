//! Topic-based event bus implementation.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::{ModuleEvent, SharedEvent, StateEvent};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize)]
pub enum Topic {
    /// Module load lifecycle (loading, ready, failed)
    Module,
    /// Shared library resolution
    Shared,
    /// Shared state container transitions
    State,
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, Serialize)]
pub enum Event {
    Module(ModuleEvent),
    Shared(SharedEvent),
    State(StateEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Module(_) => Topic::Module,
            Event::Shared(_) => Topic::Shared,
            Event::State(_) => Topic::State,
        }
    }
}

struct Channels {
    module: broadcast::Sender<Event>,
    shared: broadcast::Sender<Event>,
    state: broadcast::Sender<Event>,
}

impl Channels {
    fn get(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Module => &self.module,
            Topic::Shared => &self.shared,
            Topic::State => &self.state,
        }
    }
}

/// Topic-based event bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// events they care about. Publishing never blocks and never fails.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<Channels>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            channels: Arc::new(Channels {
                module: broadcast::channel(capacity).0,
                shared: broadcast::channel(capacity).0,
                state: broadcast::channel(capacity).0,
            }),
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if self.channels.get(topic).send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.channels.get(topic).subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
