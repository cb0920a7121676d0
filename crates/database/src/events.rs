//! Event emitter for collection and view lifecycle events.
//!
//! Events used by the engine: `"drop"`, `"change"`, `"queryChange"` and
//! `"queryOptionsChange"`. Listeners run synchronously over a snapshot
//! taken at emit time, so a listener may subscribe or unsubscribe without
//! invalidating the dispatch in flight.

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use hashbrown::HashMap;

/// Unique identifier for a registered listener.
pub type ListenerId = u64;

/// Callback type for event notifications.
pub type EventCallback = Rc<dyn Fn()>;

/// Manages listeners keyed by event name.
pub struct EventEmitter {
    listeners: HashMap<String, Vec<(ListenerId, EventCallback)>>,
    next_id: ListenerId,
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventEmitter {
    /// Creates a new emitter with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
            next_id: 1,
        }
    }

    /// Registers a listener for an event.
    ///
    /// Returns the listener ID used to unsubscribe.
    pub fn on<F>(&mut self, event: &str, callback: F) -> ListenerId
    where
        F: Fn() + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners
            .entry(event.to_string())
            .or_default()
            .push((id, Rc::new(callback)));
        id
    }

    /// Unregisters a listener by ID.
    ///
    /// Returns true if the listener was found and removed.
    pub fn off(&mut self, event: &str, id: ListenerId) -> bool {
        match self.listeners.get_mut(event) {
            Some(list) => {
                let before = list.len();
                list.retain(|(lid, _)| *lid != id);
                list.len() != before
            }
            None => false,
        }
    }

    /// Returns the callbacks registered for an event, in registration
    /// order. Callers invoke these outside any state borrow.
    pub fn snapshot(&self, event: &str) -> Vec<EventCallback> {
        self.listeners
            .get(event)
            .map(|list| list.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns the number of listeners for an event.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map(|l| l.len()).unwrap_or(0)
    }

    /// Removes every listener.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}
