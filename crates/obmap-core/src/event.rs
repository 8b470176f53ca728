#![forbid(unsafe_code)]

//! Change events delivered to the `emit` notification hook.

use std::rc::Rc;

use crate::map::ObservableMap;

/// Handler signature accepted by the `on` / `remove_listener` hooks.
///
/// Handlers are shared `Rc` closures; backends that support unregistering a
/// single handler compare them by pointer identity (`Rc::ptr_eq`).
pub type Handler<V> = Rc<dyn Fn(&Change<V>)>;

/// Kind of a committed mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A value was stored under a key that had no entry (or a replacement
    /// completed after the old value was removed).
    Add,
    /// An entry was deleted, either by `remove` or as the first half of a
    /// replacement.
    Remove,
}

impl ChangeKind {
    /// The event name passed to the `emit` hook for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload emitted for every committed mutation.
///
/// `target` is a handle to the container the mutation happened on; handles
/// are cheap clones sharing one inner state, so receivers can read back
/// through it or compare it against a known container with
/// [`ObservableMap::ptr_eq`]. Storing the payload (and thus the handle)
/// inside a long-lived subscriber keeps the container's storage alive.
#[derive(Debug, Clone)]
pub struct Change<V> {
    /// Whether the mutation added or removed an entry.
    pub kind: ChangeKind,
    /// The container the mutation was committed on.
    pub target: ObservableMap<V>,
    /// The (already string-coerced) key the mutation applies to.
    pub key: String,
    /// The value added, or the value that was stored before removal.
    pub element: V,
}
