#![forbid(unsafe_code)]

//! Synchronous event emitter keyed by event name.
//!
//! # Invariants
//!
//! 1. Handlers for an event are delivered in registration order.
//! 2. Delivery is synchronous and inline: `emit` returns only after every
//!    handler has run.
//! 3. `remove_listener` unregisters by handler identity (`Rc::ptr_eq`); a
//!    clone of the original `Rc` removes it, a behaviorally identical but
//!    separately allocated closure does not.
//! 4. Handlers are snapshotted before delivery, so a handler may register
//!    or unregister listeners (even itself) without affecting the current
//!    delivery round.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use obmap_core::event::{Change, Handler};

/// A minimal synchronous event emitter.
///
/// Stores handlers per event name and calls them inline on `emit`. This is
/// the concrete backend the container core is deliberately ignorant of; it
/// only ever reaches one through the four configured hook slots.
pub struct Emitter<V> {
    listeners: RefCell<HashMap<String, Vec<Handler<V>>>>,
}

impl<V> Emitter<V> {
    /// An emitter with no registered handlers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(HashMap::new()),
        }
    }

    /// Register `handler` for `event`, after any already registered.
    pub fn on(&self, event: impl Into<String>, handler: Handler<V>) {
        let event = event.into();
        trace!(%event, "registering listener");
        self.listeners
            .borrow_mut()
            .entry(event)
            .or_default()
            .push(handler);
    }

    /// Deliver `change` to every handler registered for `event`, in
    /// registration order.
    pub fn emit(&self, event: &str, change: &Change<V>) {
        // Snapshot outside the borrow so handlers may (un)register freely.
        let handlers: Vec<Handler<V>> = self
            .listeners
            .borrow()
            .get(event)
            .cloned()
            .unwrap_or_default();
        trace!(%event, handlers = handlers.len(), "dispatching");
        for handler in &handlers {
            handler(change);
        }
    }

    /// Unregister the handler registered for `event` that shares an
    /// allocation with `handler`. Unknown handlers are a no-op.
    pub fn remove_listener(&self, event: &str, handler: &Handler<V>) {
        if let Some(handlers) = self.listeners.borrow_mut().get_mut(event) {
            handlers.retain(|registered| !Rc::ptr_eq(registered, handler));
        }
    }

    /// Drop every handler for every event.
    pub fn remove_all_listeners(&self) {
        self.listeners.borrow_mut().clear();
    }

    /// Number of handlers currently registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .borrow()
            .get(event)
            .map_or(0, Vec::len)
    }

    /// Whether no handler is registered for any event.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().values().all(Vec::is_empty)
    }
}

impl<V> Default for Emitter<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for Emitter<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.borrow();
        let mut counts: Vec<(&str, usize)> = listeners
            .iter()
            .map(|(event, handlers)| (event.as_str(), handlers.len()))
            .collect();
        counts.sort_unstable();
        f.debug_struct("Emitter").field("listeners", &counts).finish()
    }
}
