#![forbid(unsafe_code)]

//! Notification hook configuration: the four-slot hook record, shared
//! configuration contexts, and per-container overrides.
//!
//! # Design
//!
//! A [`NotifyHooks`] record holds exactly four slots (`emit`, `on`,
//! `remove_listener`, `remove_all_listeners`). Containers never talk to a
//! notification backend directly; they resolve the record through a
//! [`Context`] handle at the moment of each operation, so reconfiguring a
//! context is visible to every container bound to it that has not been
//! disposed yet (late binding).
//!
//! [`Context::thread_default()`] hands out one shared context per value type
//! and thread. Containers constructed without an explicit context bind to it,
//! which preserves "configure once, affects all subsequently constructed
//! containers" without a mutable process-wide global.
//!
//! # Invariants
//!
//! 1. A freshly created context carries the no-op hook set; calling any slot
//!    before `configure` is safe and does nothing.
//! 2. `configure` replaces the record wholesale. There is no partial merge;
//!    callers supply the full set they want active.
//! 3. `thread_default()` returns handles to the *same* context for one value
//!    type on one thread, and unrelated contexts across threads.
//! 4. A [`HookOverride`] only shadows the slots it sets; unset slots fall
//!    through to the context at resolution time, not at attach time.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::event::{Change, Handler};

/// `emit(event_name, payload)`: invoked synchronously on every committed
/// mutation.
pub type EmitHook<V> = Rc<dyn Fn(&str, Change<V>)>;
/// `on(event_name, handler)`: registers a handler. Never called by the
/// container core itself; exposed for adapters.
pub type OnHook<V> = Rc<dyn Fn(&str, Handler<V>)>;
/// `remove_listener(event_name, handler)`: symmetric unregister, likewise
/// adapter-facing.
pub type RemoveListenerHook<V> = Rc<dyn Fn(&str, &Handler<V>)>;
/// `remove_all_listeners()`: invoked exactly once during container
/// disposal.
pub type RemoveAllListenersHook = Rc<dyn Fn()>;

/// The four notification hooks a container delegates all observability to.
pub struct NotifyHooks<V> {
    pub emit: EmitHook<V>,
    pub on: OnHook<V>,
    pub remove_listener: RemoveListenerHook<V>,
    pub remove_all_listeners: RemoveAllListenersHook,
}

impl<V> NotifyHooks<V> {
    /// The default, no-op-safe hook set: every slot accepts its arguments
    /// and does nothing.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            emit: Rc::new(|_, _| {}),
            on: Rc::new(|_, _| {}),
            remove_listener: Rc::new(|_, _| {}),
            remove_all_listeners: Rc::new(|| {}),
        }
    }
}

impl<V> Default for NotifyHooks<V> {
    fn default() -> Self {
        Self::noop()
    }
}

// Manual Clone: slots are Rc, no V: Clone requirement.
impl<V> Clone for NotifyHooks<V> {
    fn clone(&self) -> Self {
        Self {
            emit: Rc::clone(&self.emit),
            on: Rc::clone(&self.on),
            remove_listener: Rc::clone(&self.remove_listener),
            remove_all_listeners: Rc::clone(&self.remove_all_listeners),
        }
    }
}

impl<V> std::fmt::Debug for NotifyHooks<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyHooks").finish_non_exhaustive()
    }
}

/// Partial hook record layered over a context by a single container.
///
/// Each slot is `Option`: `Some(hook)` shadows the context's slot, `None`
/// falls through. This lets one container replace, say, only its
/// `remove_all_listeners` without affecting other containers on the same
/// context.
pub struct HookOverride<V> {
    pub emit: Option<EmitHook<V>>,
    pub on: Option<OnHook<V>>,
    pub remove_listener: Option<RemoveListenerHook<V>>,
    pub remove_all_listeners: Option<RemoveAllListenersHook>,
}

impl<V> HookOverride<V> {
    /// An empty override: every slot falls through.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            emit: None,
            on: None,
            remove_listener: None,
            remove_all_listeners: None,
        }
    }

    /// Shadow the `emit` slot.
    #[must_use]
    pub fn emit(mut self, hook: impl Fn(&str, Change<V>) + 'static) -> Self {
        self.emit = Some(Rc::new(hook));
        self
    }

    /// Shadow the `on` slot.
    #[must_use]
    pub fn on(mut self, hook: impl Fn(&str, Handler<V>) + 'static) -> Self {
        self.on = Some(Rc::new(hook));
        self
    }

    /// Shadow the `remove_listener` slot.
    #[must_use]
    pub fn remove_listener(mut self, hook: impl Fn(&str, &Handler<V>) + 'static) -> Self {
        self.remove_listener = Some(Rc::new(hook));
        self
    }

    /// Shadow the `remove_all_listeners` slot.
    #[must_use]
    pub fn remove_all_listeners(mut self, hook: impl Fn() + 'static) -> Self {
        self.remove_all_listeners = Some(Rc::new(hook));
        self
    }

    /// Whether any slot is shadowed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emit.is_none()
            && self.on.is_none()
            && self.remove_listener.is_none()
            && self.remove_all_listeners.is_none()
    }

    /// Resolve a full hook set: shadowed slots win, the rest come from
    /// `base`.
    #[must_use]
    pub fn resolve_over(&self, base: &NotifyHooks<V>) -> NotifyHooks<V> {
        NotifyHooks {
            emit: self.emit.clone().unwrap_or_else(|| Rc::clone(&base.emit)),
            on: self.on.clone().unwrap_or_else(|| Rc::clone(&base.on)),
            remove_listener: self
                .remove_listener
                .clone()
                .unwrap_or_else(|| Rc::clone(&base.remove_listener)),
            remove_all_listeners: self
                .remove_all_listeners
                .clone()
                .unwrap_or_else(|| Rc::clone(&base.remove_all_listeners)),
        }
    }
}

impl<V> Default for HookOverride<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> From<NotifyHooks<V>> for HookOverride<V> {
    /// An override shadowing all four slots with the given record.
    fn from(hooks: NotifyHooks<V>) -> Self {
        Self {
            emit: Some(hooks.emit),
            on: Some(hooks.on),
            remove_listener: Some(hooks.remove_listener),
            remove_all_listeners: Some(hooks.remove_all_listeners),
        }
    }
}

impl<V> Clone for HookOverride<V> {
    fn clone(&self) -> Self {
        Self {
            emit: self.emit.clone(),
            on: self.on.clone(),
            remove_listener: self.remove_listener.clone(),
            remove_all_listeners: self.remove_all_listeners.clone(),
        }
    }
}

impl<V> std::fmt::Debug for HookOverride<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookOverride")
            .field("emit", &self.emit.is_some())
            .field("on", &self.on.is_some())
            .field("remove_listener", &self.remove_listener.is_some())
            .field("remove_all_listeners", &self.remove_all_listeners.is_some())
            .finish()
    }
}

// One default context per value type per thread. Keyed by the TypeId of the
// fully instantiated Context<V> so unrelated value types never collide.
thread_local! {
    static THREAD_DEFAULTS: RefCell<HashMap<TypeId, Box<dyn Any>>> =
        RefCell::new(HashMap::new());
}

/// Shared handle to an active hook configuration.
///
/// Cloning a `Context` creates a new handle to the **same** configuration;
/// `configure` through any handle is observed by all of them.
pub struct Context<V> {
    hooks: Rc<RefCell<NotifyHooks<V>>>,
}

impl<V> Clone for Context<V> {
    fn clone(&self) -> Self {
        Self {
            hooks: Rc::clone(&self.hooks),
        }
    }
}

impl<V: 'static> Context<V> {
    /// A fresh, independent context carrying the no-op hook set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hooks: Rc::new(RefCell::new(NotifyHooks::noop())),
        }
    }

    /// The shared default context for value type `V` on this thread.
    ///
    /// Containers constructed without an explicit context bind to this one,
    /// so configuring it affects all of them at once.
    #[must_use]
    pub fn thread_default() -> Self {
        THREAD_DEFAULTS.with(|defaults| {
            let mut defaults = defaults.borrow_mut();
            let entry = defaults
                .entry(TypeId::of::<Self>())
                .or_insert_with(|| Box::new(Self::new()));
            entry
                .downcast_ref::<Self>()
                .expect("thread-default table maps TypeId::of::<Context<V>> to Context<V>")
                .clone()
        })
    }

    /// Replace the active hook set wholesale.
    pub fn configure(&self, hooks: NotifyHooks<V>) {
        *self.hooks.borrow_mut() = hooks;
        debug!("notification hooks reconfigured");
    }

    /// Snapshot of the active hook set (cheap: four `Rc` clones).
    #[must_use]
    pub fn current(&self) -> NotifyHooks<V> {
        self.hooks.borrow().clone()
    }

    /// Register a handler through the active `on` slot.
    ///
    /// Passthrough convenience for adapters; the container core never calls
    /// this.
    pub fn on(&self, event: &str, handler: Handler<V>) {
        (self.current().on)(event, handler);
    }

    /// Unregister a handler through the active `remove_listener` slot.
    pub fn remove_listener(&self, event: &str, handler: &Handler<V>) {
        (self.current().remove_listener)(event, handler);
    }

    /// Whether two handles point at the same configuration.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.hooks, &other.hooks)
    }
}

impl<V: 'static> Default for Context<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for Context<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}
