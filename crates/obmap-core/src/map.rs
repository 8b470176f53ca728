#![forbid(unsafe_code)]

//! Observable string-keyed container with synchronous change notification.
//!
//! # Design
//!
//! [`ObservableMap<V>`] wraps an ordered `BTreeMap<String, V>` in shared,
//! reference-counted storage (`Rc<RefCell<..>>`). Every committed mutation
//! is diffed against the current entry and reported through the `emit` slot
//! of the hooks resolved from the container's [`Context`] at that moment
//! (late binding), shadowed by any per-container [`HookOverride`].
//!
//! Keys are coerced to their canonical string form (`ToString`) before any
//! lookup or mutation, so `map.set(42, v)` and `map.get("42")` address the
//! same entry.
//!
//! # Invariants
//!
//! 1. At most one value exists per key.
//! 2. `set(k, v)` where `v` equals the stored value (`PartialEq`) is a
//!    no-op: no mutation, no event.
//! 3. Replacing a value emits `remove` (old element, still stored while the
//!    handlers run) followed by `add` (new element).
//! 4. `remove(k)` on a present key emits exactly one `remove`; on an absent
//!    key it emits nothing.
//! 5. Hooks are invoked with no interior borrow held, so handlers may read
//!    back through `change.target` and may even mutate the container.
//! 6. After `dispose()`, the element storage is unreachable from the
//!    container and every read behaves as "no entries".
//!
//! # Failure Modes
//!
//! | Mode | Condition | Behavior |
//! |------|-----------|----------|
//! | Operation on disposed container | Any call after `dispose()` | Reads return "no entries", mutations are silent no-ops |
//! | Handler panics | Subscriber panics inside `emit` | Propagates to the mutating caller; the mutation it reports is already committed |
//! | Aliased storage mutated directly | Writes through `storage()` | Visible to the container, bypasses notification by design |

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::config::{Context, HookOverride, NotifyHooks};
use crate::event::{Change, ChangeKind};

/// Shared handle to a container's element storage.
///
/// Containers constructed over an existing handle alias it rather than copy
/// it: mutations through either side are visible through the other.
pub type SharedElements<V> = Rc<RefCell<BTreeMap<String, V>>>;

struct MapInner<V> {
    // None once disposed.
    elements: Option<SharedElements<V>>,
    context: Context<V>,
    overrides: HookOverride<V>,
}

/// An observable string-keyed container.
///
/// Cloning an `ObservableMap` creates a new handle to the **same** inner
/// state: both handles see the same entries, context, and overrides. Use
/// [`ObservableMap::ptr_eq`] to compare handle identity (event payloads
/// carry such a handle as their `target`).
pub struct ObservableMap<V> {
    inner: Rc<RefCell<MapInner<V>>>,
}

// Manual Clone: shares the same Rc.
impl<V> Clone for ObservableMap<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for ObservableMap<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        let mut out = f.debug_struct("ObservableMap");
        match &inner.elements {
            Some(elements) => out.field("elements", &*elements.borrow()),
            None => out.field("disposed", &true),
        };
        out.finish()
    }
}

impl<V: Clone + PartialEq + 'static> ObservableMap<V> {
    /// Create an empty container bound to the thread-default context.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parts(Rc::new(RefCell::new(BTreeMap::new())), Context::thread_default())
    }

    /// Create a container whose internal mapping **is** `elements`.
    ///
    /// No copy is made: external mutation of the handle is visible through
    /// the container and vice versa. Wrapper types that compose a container
    /// construct through here (or [`ObservableMap::with_parts`]) to keep the
    /// aliasing behavior.
    #[must_use]
    pub fn with_elements(elements: SharedElements<V>) -> Self {
        Self::with_parts(elements, Context::thread_default())
    }

    /// Create an empty container bound to an explicit context.
    #[must_use]
    pub fn in_context(context: Context<V>) -> Self {
        Self::with_parts(Rc::new(RefCell::new(BTreeMap::new())), context)
    }

    /// Create a container from an existing storage handle and context.
    #[must_use]
    pub fn with_parts(elements: SharedElements<V>, context: Context<V>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(MapInner {
                elements: Some(elements),
                context,
                overrides: HookOverride::new(),
            })),
        }
    }

    /// Configure the thread-default context for value type `V`.
    ///
    /// Affects every container bound to the default context, including ones
    /// constructed later.
    pub fn configure(hooks: NotifyHooks<V>) {
        Context::thread_default().configure(hooks);
    }

    /// The context this container resolves hooks through.
    #[must_use]
    pub fn context(&self) -> Context<V> {
        self.inner.borrow().context.clone()
    }

    /// Install a per-container hook override.
    ///
    /// Shadowed slots win over the context from the next operation on;
    /// unset slots keep falling through, so a later `configure` on the
    /// context still reaches them.
    pub fn override_hooks(&self, overrides: HookOverride<V>) {
        self.inner.borrow_mut().overrides = overrides;
    }

    /// The internal storage handle, by reference (no copy).
    ///
    /// This is the aliasing escape hatch: mutations through the returned
    /// handle bypass diffing and notification entirely. After `dispose()` a
    /// fresh empty handle is returned that is no longer connected to
    /// anything.
    #[must_use]
    pub fn storage(&self) -> SharedElements<V> {
        match self.live_elements() {
            Some(elements) => elements,
            None => Rc::new(RefCell::new(BTreeMap::new())),
        }
    }

    /// Store `value` under `key`, reporting the change.
    ///
    /// If the stored value equals `value` the call is a no-op. Replacing a
    /// different value emits `remove` with the old element first, then
    /// `add` with the new one; a fresh insert emits only `add`. Returns the
    /// container for chaining.
    pub fn set(&self, key: impl ToString, value: V) -> &Self {
        let key = key.to_string();
        let Some(elements) = self.live_elements() else {
            return self;
        };
        let old = elements.borrow().get(&key).cloned();
        match old {
            Some(old) if old == value => {
                trace!(%key, "set: value unchanged, no event");
            }
            Some(old) => {
                // Old value stays stored while its remove handlers run.
                self.emit(ChangeKind::Remove, key.clone(), old);
                elements.borrow_mut().insert(key.clone(), value.clone());
                self.emit(ChangeKind::Add, key, value);
            }
            None => {
                elements.borrow_mut().insert(key.clone(), value.clone());
                self.emit(ChangeKind::Add, key, value);
            }
        }
        self
    }

    /// `set` every pair of `entries`, in iteration order.
    ///
    /// No batching: each pair runs the full `set` contract and fires its own
    /// event sequence. Returns the container for chaining.
    pub fn set_all<K: ToString>(&self, entries: impl IntoIterator<Item = (K, V)>) -> &Self {
        for (key, value) in entries {
            self.set(key, value);
        }
        self
    }

    /// The value stored under `key`, or `None`. Emits nothing.
    #[must_use]
    pub fn get(&self, key: impl ToString) -> Option<V> {
        let elements = self.live_elements()?;
        let value = elements.borrow().get(&key.to_string()).cloned();
        value
    }

    /// A **fresh** mapping of every current entry, in key order.
    ///
    /// Built by calling [`ObservableMap::get`] per key; never the internal
    /// mapping itself, so callers can hold or mutate it freely.
    #[must_use]
    pub fn entries(&self) -> BTreeMap<String, V> {
        let keys = self.keys();
        let mut all = BTreeMap::new();
        for key in keys {
            if let Some(value) = self.get(&key) {
                all.insert(key, value);
            }
        }
        all
    }

    /// Whether `key` is an own entry of the container.
    ///
    /// `BTreeMap` has no inherited or default entries, so this is exactly
    /// "was a value stored under this key": zero, empty, and null-like
    /// *values* all count as present.
    #[must_use]
    pub fn has(&self, key: impl ToString) -> bool {
        self.live_elements()
            .is_some_and(|elements| elements.borrow().contains_key(&key.to_string()))
    }

    /// Delete the entry under `key`, reporting the removal.
    ///
    /// An absent key is a defined no-op: nothing is emitted and `None` is
    /// returned. Otherwise the old element comes back after exactly one
    /// `remove` event carrying it.
    pub fn remove(&self, key: impl ToString) -> Option<V> {
        let key = key.to_string();
        let elements = self.live_elements()?;
        let old = elements.borrow_mut().remove(&key)?;
        self.emit(ChangeKind::Remove, key, old.clone());
        Some(old)
    }

    /// Number of own entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live_elements()
            .map_or(0, |elements| elements.borrow().len())
    }

    /// Whether the container has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every current key, in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.live_elements().map_or_else(Vec::new, |elements| {
            elements.borrow().keys().cloned().collect()
        })
    }

    /// Invoke the resolved `remove_all_listeners` hook once, then release
    /// the element storage.
    ///
    /// The container is inert afterwards: reads behave as "no entries",
    /// mutations are silent no-ops, and a second `dispose()` does nothing
    /// (the hook does not run again). Other handles to the storage obtained
    /// earlier via [`ObservableMap::storage`] or
    /// [`ObservableMap::with_elements`] keep the mapping itself alive.
    pub fn dispose(&self) {
        if self.is_disposed() {
            return;
        }
        let hooks = self.resolved_hooks();
        (hooks.remove_all_listeners)();
        self.inner.borrow_mut().elements = None;
        debug!("container disposed");
    }

    /// Whether `dispose()` has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.borrow().elements.is_none()
    }

    /// Whether two handles point at the same container.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn live_elements(&self) -> Option<SharedElements<V>> {
        self.inner.borrow().elements.clone()
    }

    // Hooks are resolved per emission so a reconfigured context is picked up
    // mid-operation order: overrides shadow, the rest falls through.
    fn resolved_hooks(&self) -> NotifyHooks<V> {
        let inner = self.inner.borrow();
        inner.overrides.resolve_over(&inner.context.current())
    }

    fn emit(&self, kind: ChangeKind, key: String, element: V) {
        let hooks = self.resolved_hooks();
        trace!(kind = kind.as_str(), %key, "emitting change");
        (hooks.emit)(
            kind.as_str(),
            Change {
                kind,
                target: self.clone(),
                key,
                element,
            },
        );
    }
}

impl<V: Clone + PartialEq + 'static> Default for ObservableMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Handler;
    use serde_json::{Value, json};
    use std::cell::Cell;

    // Recording fixture: an isolated context whose emit hook logs every
    // (event name, change) pair.
    fn recording_context<V: Clone + PartialEq + 'static>()
    -> (Context<V>, Rc<RefCell<Vec<(String, Change<V>)>>>) {
        let log: Rc<RefCell<Vec<(String, Change<V>)>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let ctx = Context::new();
        ctx.configure(NotifyHooks {
            emit: Rc::new(move |event, change| {
                sink.borrow_mut().push((event.to_string(), change));
            }),
            ..NotifyHooks::noop()
        });
        (ctx, log)
    }

    fn names(log: &Rc<RefCell<Vec<(String, Change<&'static str>)>>>) -> Vec<String> {
        log.borrow().iter().map(|(name, _)| name.clone()).collect()
    }

    #[test]
    fn set_then_get() {
        let (ctx, _log) = recording_context();
        let map = ObservableMap::in_context(ctx);
        map.set("greeting", "hi");
        assert_eq!(map.get("greeting"), Some("hi"));
        assert_eq!(map.get("goodbye"), None);
    }

    #[test]
    fn set_is_chainable() {
        let (ctx, _log) = recording_context();
        let map = ObservableMap::in_context(ctx);
        map.set("a", 1).set("b", 2);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn keys_coerce_to_canonical_strings() {
        let (ctx, _log) = recording_context();
        let map = ObservableMap::in_context(ctx);
        map.set(42, "answer");
        assert_eq!(map.get("42"), Some("answer"));
        assert!(map.has(42));
        map.remove("42");
        assert!(!map.has(42));
    }

    #[test]
    fn fresh_insert_emits_add() {
        let (ctx, log) = recording_context();
        let map = ObservableMap::in_context(ctx);
        map.set("greeting", "hi");

        let log = log.borrow();
        assert_eq!(log.len(), 1);
        let (name, change) = &log[0];
        assert_eq!(name, "add");
        assert_eq!(change.kind, ChangeKind::Add);
        assert_eq!(change.key, "greeting");
        assert_eq!(change.element, "hi");
        assert!(change.target.ptr_eq(&map));
    }

    #[test]
    fn replace_emits_remove_then_add() {
        let (ctx, log) = recording_context();
        let map = ObservableMap::in_context(ctx);
        map.set("greeting", "hi");
        log.borrow_mut().clear();

        map.set("greeting", "ahoi");
        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].0, "remove");
        assert_eq!(log[0].1.element, "hi");
        assert_eq!(log[1].0, "add");
        assert_eq!(log[1].1.element, "ahoi");
    }

    #[test]
    fn equal_value_is_a_silent_no_op() {
        let (ctx, log) = recording_context();
        let map = ObservableMap::in_context(ctx);
        map.set("greeting", "hi");
        map.set("greeting", "hi");
        assert_eq!(names(&log), vec!["add"]);
    }

    #[test]
    fn old_value_still_stored_while_remove_handlers_run() {
        let ctx: Context<&'static str> = Context::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        ctx.configure(NotifyHooks {
            emit: Rc::new(move |event, change: Change<&'static str>| {
                if event == "remove" {
                    sink.borrow_mut().push(change.target.get(&change.key));
                }
            }),
            ..NotifyHooks::noop()
        });
        let map = ObservableMap::in_context(ctx);
        map.set("greeting", "hi");
        map.set("greeting", "ahoi");
        assert_eq!(*seen.borrow(), vec![Some("hi")]);
    }

    #[test]
    fn cross_type_values_are_distinct() {
        let (ctx, log) = recording_context::<Value>();
        let map = ObservableMap::in_context(ctx);
        map.set("n", json!(0));
        map.set("n", json!("0"));

        // Coercive-equal but differently typed values replace and emit.
        let log = log.borrow();
        let sequence: Vec<&str> = log.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(sequence, vec!["add", "remove", "add"]);
        assert_eq!(map.get("n"), Some(json!("0")));
    }

    #[test]
    fn set_all_runs_set_per_pair_in_order() {
        let (ctx, log) = recording_context();
        let map = ObservableMap::in_context(ctx);
        let chained = map.set_all([("greeting", "hi"), ("goodbye", "ciao")]);
        assert!(chained.ptr_eq(&map));

        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!((log[0].0.as_str(), log[0].1.key.as_str()), ("add", "greeting"));
        assert_eq!((log[1].0.as_str(), log[1].1.key.as_str()), ("add", "goodbye"));
    }

    #[test]
    fn entries_is_fresh_but_value_equal() {
        let (ctx, _log) = recording_context();
        let map = ObservableMap::in_context(ctx);
        map.set_all([("a", 1), ("b", 2)]);

        let mut entries = map.entries();
        assert_eq!(entries, *map.storage().borrow());

        // Mutating the copy must not touch the container.
        entries.insert("c".to_string(), 3);
        assert!(!map.has("c"));
    }

    #[test]
    fn has_counts_stored_null_like_values_as_present() {
        let (ctx, _log) = recording_context::<Value>();
        let map = ObservableMap::in_context(ctx);
        map.set("null", Value::Null);
        map.set("zero", json!(0));
        map.set("empty", json!(""));

        assert!(map.has("null"));
        assert!(map.has("zero"));
        assert!(map.has("empty"));
        assert!(!map.has("missing"));
    }

    #[test]
    fn remove_emits_once_and_returns_old_element() {
        let (ctx, log) = recording_context();
        let map = ObservableMap::in_context(ctx);
        map.set("greeting", "hi");
        log.borrow_mut().clear();

        assert_eq!(map.remove("greeting"), Some("hi"));
        assert!(!map.has("greeting"));

        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, "remove");
        assert_eq!(log[0].1.element, "hi");
        assert_eq!(log[0].1.key, "greeting");
    }

    #[test]
    fn remove_absent_key_is_a_silent_no_op() {
        let (ctx, log) = recording_context::<&'static str>();
        let map = ObservableMap::in_context(ctx);
        assert_eq!(map.remove("missing"), None);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn seeded_storage_is_aliased_not_copied() {
        let shared: SharedElements<i32> = Rc::new(RefCell::new(BTreeMap::new()));
        let (ctx, log) = recording_context();
        let map = ObservableMap::with_parts(Rc::clone(&shared), ctx);

        // External mutation is visible through the container and emits
        // nothing (notification was bypassed on purpose).
        shared.borrow_mut().insert("direct".to_string(), 1);
        assert_eq!(map.get("direct"), Some(1));
        assert!(log.borrow().is_empty());

        // And container mutation is visible through the external handle.
        map.set("observed", 2);
        assert_eq!(shared.borrow().get("observed"), Some(&2));
        assert!(Rc::ptr_eq(&map.storage(), &shared));
    }

    #[test]
    fn clone_shares_state() {
        let (ctx, log) = recording_context();
        let map = ObservableMap::in_context(ctx);
        let alias = map.clone();
        alias.set("greeting", "hi");
        assert_eq!(map.get("greeting"), Some("hi"));
        assert!(log.borrow()[0].1.target.ptr_eq(&map));
    }

    #[test]
    fn dispose_runs_remove_all_listeners_exactly_once() {
        let calls = Rc::new(Cell::new(0u32));
        let sink = Rc::clone(&calls);
        let ctx: Context<i32> = Context::new();
        ctx.configure(NotifyHooks {
            remove_all_listeners: Rc::new(move || sink.set(sink.get() + 1)),
            ..NotifyHooks::noop()
        });

        let map = ObservableMap::in_context(ctx);
        map.set("a", 1);
        map.dispose();
        assert_eq!(calls.get(), 1);
        assert!(map.is_disposed());

        // Second dispose must not re-run the hook.
        map.dispose();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn disposed_container_is_inert() {
        let (ctx, log) = recording_context();
        let map = ObservableMap::in_context(ctx);
        map.set("greeting", "hi");
        log.borrow_mut().clear();
        map.dispose();

        assert_eq!(map.get("greeting"), None);
        assert!(!map.has("greeting"));
        assert_eq!(map.len(), 0);
        assert!(map.is_empty());
        assert!(map.entries().is_empty());
        assert!(map.storage().borrow().is_empty());

        map.set("greeting", "ahoi");
        assert_eq!(map.remove("greeting"), None);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn reconfigured_context_reaches_live_containers() {
        let ctx: Context<i32> = Context::new();
        let map = ObservableMap::in_context(ctx.clone());
        map.set("silent", 1); // noop hooks, nothing recorded anywhere

        let count = Rc::new(Cell::new(0u32));
        let sink = Rc::clone(&count);
        ctx.configure(NotifyHooks {
            emit: Rc::new(move |_, _| sink.set(sink.get() + 1)),
            ..NotifyHooks::noop()
        });
        map.set("heard", 2);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn override_shadows_one_slot_per_container() {
        let shared_calls = Rc::new(Cell::new(0u32));
        let own_calls = Rc::new(Cell::new(0u32));

        let ctx: Context<i32> = Context::new();
        let sink = Rc::clone(&shared_calls);
        ctx.configure(NotifyHooks {
            remove_all_listeners: Rc::new(move || sink.set(sink.get() + 1)),
            ..NotifyHooks::noop()
        });

        let plain = ObservableMap::in_context(ctx.clone());
        let overridden = ObservableMap::in_context(ctx);
        let sink = Rc::clone(&own_calls);
        overridden.override_hooks(
            HookOverride::new().remove_all_listeners(move || sink.set(sink.get() + 1)),
        );

        overridden.dispose();
        assert_eq!((shared_calls.get(), own_calls.get()), (0, 1));

        plain.dispose();
        assert_eq!((shared_calls.get(), own_calls.get()), (1, 1));
    }

    #[test]
    fn thread_default_configuration_reaches_plain_constructors() {
        // Scoped to u8 so the thread-default for other value types used by
        // sibling tests stays untouched.
        let count = Rc::new(Cell::new(0u32));
        let sink = Rc::clone(&count);
        ObservableMap::<u8>::configure(NotifyHooks {
            emit: Rc::new(move |_, _| sink.set(sink.get() + 1)),
            ..NotifyHooks::noop()
        });

        let first: ObservableMap<u8> = ObservableMap::new();
        let second: ObservableMap<u8> = ObservableMap::default();
        first.set("a", 1);
        second.set("b", 2);
        assert_eq!(count.get(), 2);
        assert!(first.context().ptr_eq(&second.context()));
    }

    #[test]
    fn handlers_may_mutate_the_container() {
        let ctx: Context<i32> = Context::new();
        let armed = Rc::new(Cell::new(true));
        let flag = Rc::clone(&armed);
        ctx.configure(NotifyHooks {
            emit: Rc::new(move |event, change: Change<i32>| {
                if event == "add" && flag.replace(false) {
                    change.target.set("echo", change.element + 1);
                }
            }),
            ..NotifyHooks::noop()
        });

        let map = ObservableMap::in_context(ctx);
        map.set("value", 1);
        assert_eq!(map.get("echo"), Some(2));
    }

    #[test]
    fn on_and_remove_listener_hooks_are_not_called_by_the_core() {
        let touched = Rc::new(Cell::new(false));
        let on_sink = Rc::clone(&touched);
        let off_sink = Rc::clone(&touched);
        let ctx: Context<i32> = Context::new();
        ctx.configure(NotifyHooks {
            on: Rc::new(move |_, _| on_sink.set(true)),
            remove_listener: Rc::new(move |_, _| off_sink.set(true)),
            ..NotifyHooks::noop()
        });

        let map = ObservableMap::in_context(ctx.clone());
        map.set("a", 1).set("a", 2);
        map.remove("a");
        map.dispose();
        assert!(!touched.get());

        // They are reachable for adapters through the context passthroughs.
        ctx.on("add", Rc::new(|_: &Change<i32>| {}) as Handler<i32>);
        assert!(touched.get());
    }
}
