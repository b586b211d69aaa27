//! Host-owned state container and the narrow capability handed to remotes.
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use super::action::Action;
use crate::events::{Event, EventBus, StateEvent};

/// Pure transition function of a [`Store`].
pub trait Reducer: Send + Sync + 'static {
    type State: Clone + Send + Sync + 'static;

    fn initial_state(&self) -> Self::State;

    /// Next state for `action`, or `None` when the action is not recognized.
    fn reduce(&self, state: &Self::State, action: &Action) -> Option<Self::State>;
}

type Listener<S> = Arc<dyn Fn(&S) + Send + Sync>;

struct Listeners<S> {
    next_id: u64,
    entries: BTreeMap<u64, Listener<S>>,
}

/// Snapshots waiting for delivery, in revision order.
struct Outbox<S> {
    pending: VecDeque<Arc<S>>,
    draining: bool,
}

struct StoreShared<R: Reducer> {
    reducer: R,
    state: ArcSwap<R::State>,
    /// Serializes writers; holds the revision of the current state.
    writer: Mutex<u64>,
    listeners: Mutex<Listeners<R::State>>,
    /// Filled under the writer lock, drained by one thread at a time.
    outbox: Mutex<Outbox<R::State>>,
    event_bus: Option<EventBus>,
}

/// The single authoritative state container, owned by the host.
///
/// Reads are lock-free snapshot loads. Writes go through [`Store::dispatch`]
/// only; each accepted action swaps in a fully built next state.
pub struct Store<R: Reducer> {
    shared: Arc<StoreShared<R>>,
}

impl<R: Reducer> Clone for Store<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R: Reducer> Store<R> {
    pub fn new(reducer: R) -> Self {
        Self::build(reducer, None)
    }

    /// Publish every accepted transition on `event_bus`.
    pub fn with_event_bus(reducer: R, event_bus: EventBus) -> Self {
        Self::build(reducer, Some(event_bus))
    }

    fn build(reducer: R, event_bus: Option<EventBus>) -> Self {
        let initial = reducer.initial_state();
        Self {
            shared: Arc::new(StoreShared {
                reducer,
                state: ArcSwap::from_pointee(initial),
                writer: Mutex::new(0),
                listeners: Mutex::new(Listeners {
                    next_id: 0,
                    entries: BTreeMap::new(),
                }),
                outbox: Mutex::new(Outbox {
                    pending: VecDeque::new(),
                    draining: false,
                }),
                event_bus,
            }),
        }
    }

    pub fn get_snapshot(&self) -> Arc<R::State> {
        self.shared.state.load_full()
    }

    /// Number of accepted transitions so far.
    pub fn revision(&self) -> u64 {
        *self.shared.writer.lock()
    }

    /// Apply `action`. Returns whether it was recognized.
    pub fn dispatch(&self, action: Action) -> bool {
        self.shared.dispatch(action)
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&R::State) + Send + Sync + 'static,
    {
        let source: Arc<dyn StateSource<R::State>> = self.shared.clone();
        subscribe(&source, Arc::new(listener))
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.lock().entries.len()
    }

    /// Read/subscribe/dispatch capability over this store for remote code.
    pub fn bridge(&self) -> StateBridge<R::State> {
        StateBridge {
            source: self.shared.clone(),
        }
    }
}

impl<R: Reducer> Store<R>
where
    R::State: Serialize,
{
    /// Bridge exposing the state as JSON.
    ///
    /// Remotes compiled separately from the host cannot name `R::State`, so
    /// this is the bridge a host puts into its exports.
    pub fn json_bridge(&self) -> StateBridge<Value> {
        StateBridge {
            source: Arc::new(JsonProjection {
                store: Arc::clone(&self.shared),
            }),
        }
    }
}

impl<R: Reducer> StoreShared<R> {
    fn dispatch(&self, action: Action) -> bool {
        {
            let mut revision = self.writer.lock();
            let current = self.state.load();
            let Some(next) = self.reducer.reduce(&current, &action) else {
                tracing::trace!("Ignoring unrecognized action '{}'", action.kind);
                return false;
            };
            let next = Arc::new(next);
            self.state.store(Arc::clone(&next));
            *revision += 1;
            self.outbox.lock().pending.push_back(next);

            tracing::debug!("Applied '{}' (revision {})", action.kind, *revision);
            if let Some(bus) = &self.event_bus {
                bus.publish(Event::State(StateEvent {
                    action: action.kind,
                    revision: *revision,
                }));
            }
        }

        self.deliver();
        true
    }

    /// Notify listeners of every pending snapshot, oldest first.
    ///
    /// Runs outside the writer lock so listeners may dispatch. If another
    /// thread is already delivering, it picks up what was queued here.
    fn deliver(&self) {
        {
            let mut outbox = self.outbox.lock();
            if outbox.draining {
                return;
            }
            outbox.draining = true;
        }
        let mut guard = DrainGuard {
            outbox: &self.outbox,
            armed: true,
        };

        loop {
            let snapshot = {
                let mut outbox = self.outbox.lock();
                match outbox.pending.pop_front() {
                    Some(snapshot) => snapshot,
                    None => {
                        outbox.draining = false;
                        guard.armed = false;
                        return;
                    }
                }
            };
            let listeners: Vec<Listener<R::State>> =
                self.listeners.lock().entries.values().cloned().collect();
            for listener in listeners {
                listener(&snapshot);
            }
        }
    }
}

/// Releases the outbox if a listener panics mid-delivery.
struct DrainGuard<'a, S> {
    outbox: &'a Mutex<Outbox<S>>,
    armed: bool,
}

impl<S> Drop for DrainGuard<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            self.outbox.lock().draining = false;
        }
    }
}

/// Type-erased view of a store; what a [`StateBridge`] holds.
trait StateSource<S>: Send + Sync {
    fn snapshot(&self) -> Arc<S>;
    fn add_listener(&self, listener: Listener<S>) -> u64;
    fn remove_listener(&self, id: u64);
    fn dispatch(&self, action: Action) -> bool;
}

impl<R: Reducer> StateSource<R::State> for StoreShared<R> {
    fn snapshot(&self) -> Arc<R::State> {
        self.state.load_full()
    }

    fn add_listener(&self, listener: Listener<R::State>) -> u64 {
        let mut listeners = self.listeners.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.insert(id, listener);
        id
    }

    fn remove_listener(&self, id: u64) {
        self.listeners.lock().entries.remove(&id);
    }

    fn dispatch(&self, action: Action) -> bool {
        StoreShared::dispatch(self, action)
    }
}

struct JsonProjection<R: Reducer> {
    store: Arc<StoreShared<R>>,
}

fn to_json<S: Serialize>(state: &S) -> Value {
    serde_json::to_value(state).unwrap_or_else(|e| {
        tracing::warn!("State is not representable as JSON: {}", e);
        Value::Null
    })
}

impl<R: Reducer> StateSource<Value> for JsonProjection<R>
where
    R::State: Serialize,
{
    fn snapshot(&self) -> Arc<Value> {
        Arc::new(to_json(&**self.store.state.load()))
    }

    fn add_listener(&self, listener: Listener<Value>) -> u64 {
        self.store
            .add_listener(Arc::new(move |state: &R::State| listener(&to_json(state))))
    }

    fn remove_listener(&self, id: u64) {
        self.store.remove_listener(id);
    }

    fn dispatch(&self, action: Action) -> bool {
        self.store.dispatch(action)
    }
}

fn subscribe<S: 'static>(source: &Arc<dyn StateSource<S>>, listener: Listener<S>) -> Subscription {
    let id = source.add_listener(listener);
    let source: Weak<dyn StateSource<S>> = Arc::downgrade(source);
    Subscription {
        active: AtomicBool::new(true),
        detach: Box::new(move || {
            if let Some(source) = source.upgrade() {
                source.remove_listener(id);
            }
        }),
    }
}

/// Narrow capability over the host's store.
///
/// Offers snapshots, subscriptions and dispatch; never the store itself, so a
/// holder cannot register slices or replace state directly.
pub struct StateBridge<S> {
    source: Arc<dyn StateSource<S>>,
}

impl<S> Clone for StateBridge<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<S: 'static> StateBridge<S> {
    /// Current state; always a fully applied transition.
    pub fn get_snapshot(&self) -> Arc<S> {
        self.source.snapshot()
    }

    /// Call `listener` after every accepted transition.
    ///
    /// Dropping the returned [`Subscription`] keeps the listener registered;
    /// call [`Subscription::unsubscribe`] to remove it.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        subscribe(&self.source, Arc::new(listener))
    }

    /// Forward `action` to the host. Unrecognized actions are ignored.
    pub fn dispatch(&self, action: Action) -> bool {
        self.source.dispatch(action)
    }
}

impl<S> std::fmt::Debug for StateBridge<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateBridge").finish_non_exhaustive()
    }
}

/// Registration of one listener.
pub struct Subscription {
    active: AtomicBool,
    detach: Box<dyn Fn() + Send + Sync>,
}

impl Subscription {
    /// Remove the listener. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            (self.detach)();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    struct Counter;

    impl Reducer for Counter {
        type State = i64;

        fn initial_state(&self) -> i64 {
            0
        }

        fn reduce(&self, state: &i64, action: &Action) -> Option<i64> {
            match action.kind.as_str() {
                "counter/increment" => Some(state + 1),
                "counter/incrementByAmount" => Some(state + action.payload_as::<i64>()?),
                _ => None,
            }
        }
    }

    fn counting_listener(store: &Store<Counter>) -> (Arc<AtomicUsize>, Subscription) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let sub = store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (calls, sub)
    }

    #[test]
    fn accepted_action_notifies_with_new_snapshot() {
        let store = Store::new(Counter);
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        let _sub = store.bridge().subscribe(move |state: &i64| sink.lock().push(*state));

        assert!(store.dispatch(Action::new("counter/increment")));
        assert!(store.bridge().dispatch(Action::with_payload("counter/incrementByAmount", 4)));

        assert_eq!(*store.get_snapshot(), 5);
        assert_eq!(*observed.lock(), vec![1, 5]);
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn unrecognized_action_is_silent_noop() {
        let store = Store::new(Counter);
        let (calls, _sub) = counting_listener(&store);
        let before = store.get_snapshot();

        assert!(!store.bridge().dispatch(Action::new("cart/checkout")));

        assert!(Arc::ptr_eq(&before, &store.get_snapshot()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let store = Store::new(Counter);
        let (calls, sub) = counting_listener(&store);
        let (_, other) = counting_listener(&store);

        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        assert_eq!(store.listener_count(), 1);

        store.dispatch(Action::new("counter/increment"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        other.unsubscribe();
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn listener_may_dispatch() {
        let store = Store::new(Counter);
        let bridge = store.bridge();
        let _sub = store.subscribe(move |state: &i64| {
            if *state == 1 {
                bridge.dispatch(Action::new("counter/increment"));
            }
        });

        store.dispatch(Action::new("counter/increment"));
        assert_eq!(*store.get_snapshot(), 2);
    }

    #[test]
    fn concurrent_dispatches_notify_in_revision_order() {
        let store = Store::new(Counter);
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let entered_tx = Mutex::new(entered_tx);
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        let _sub = store.subscribe(move |state: &i64| {
            if *state == 1 {
                let _ = entered_tx.lock().send(());
                let _ = release_rx.lock().recv();
            }
            sink.lock().push(*state);
        });

        let writer = store.clone();
        let first = std::thread::spawn(move || writer.dispatch(Action::new("counter/increment")));
        entered_rx.recv().unwrap();

        // The first notification is still running on the other thread.
        assert!(store.dispatch(Action::new("counter/increment")));
        release_tx.send(()).unwrap();
        assert!(first.join().unwrap());

        assert_eq!(*store.get_snapshot(), 2);
        assert_eq!(*observed.lock(), vec![1, 2]);
    }

    #[test]
    fn json_bridge_projects_state() {
        let store = Store::new(Counter);
        let bridge = store.json_bridge();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = bridge.subscribe(move |state: &Value| sink.lock().push(state.clone()));

        assert!(bridge.dispatch(Action::with_payload("counter/incrementByAmount", 3)));
        assert_eq!(*bridge.get_snapshot(), Value::from(3));
        assert_eq!(*seen.lock(), vec![Value::from(3)]);

        sub.unsubscribe();
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn accepted_actions_are_published() {
        let bus = EventBus::with_capacity(8);
        let mut rx = bus.subscribe(crate::events::Topic::State);
        let store = Store::with_event_bus(Counter, bus);

        store.dispatch(Action::new("unknown"));
        store.dispatch(Action::new("counter/increment"));

        match rx.recv().await.unwrap() {
            Event::State(event) => {
                assert_eq!(event.action, "counter/increment");
                assert_eq!(event.revision, 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
