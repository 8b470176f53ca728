#![forbid(unsafe_code)]

//! Extension protocol: apply a behavior-augmenting function to a host value
//! at most once per (extension, host type) pair.
//!
//! Extensions are plain `fn` items, so the function address is their
//! identity, and the applied-record is keyed by `(TypeId of the host type,
//! extension address)` in a thread-local table. Nothing here knows about
//! containers; any `'static` host type works.
//!
//! Re-applying is a guaranteed no-op, which makes extension application safe
//! to call from multiple initialization paths. Records are never removed:
//! once applied, an extension stays applied for the life of the thread.
//!
//! # Failure Modes
//!
//! | Mode | Condition | Behavior |
//! |------|-----------|----------|
//! | Duplicate apply | Same fn, same host type | Extension not re-invoked |
//! | Re-entrant apply | Extension applies another extension | Works; the outer record is committed before the extension runs |
//! | Cross-thread | Same fn applied on two threads | Runs once per thread (records are thread-local) |

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashSet;

use tracing::debug;

/// An extension function: receives the host and an optional configuration
/// value chosen by the extension itself.
///
/// Must be a `fn` item (not a closure) so it has a stable address to key the
/// applied-record by.
pub type Extension<T, C> = fn(&mut T, Option<&C>);

thread_local! {
    // (host type, extension address) pairs already applied on this thread.
    static APPLIED: RefCell<HashSet<(TypeId, usize)>> = RefCell::new(HashSet::new());
}

/// Apply `extension` to `target` unless the same extension has already been
/// applied to `target`'s *type* on this thread. Returns `target` so calls
/// chain.
///
/// The record is per type, not per instance: applying to a second value of
/// the same type is also a no-op. Extensions that register global behavior
/// (reconfiguring a shared context, say) rely on exactly that.
pub fn apply<'a, T: 'static, C>(
    target: &'a mut T,
    extension: Extension<T, C>,
    config: Option<&C>,
) -> &'a mut T {
    let key = (TypeId::of::<T>(), extension as usize);
    let first = APPLIED.with(|applied| applied.borrow_mut().insert(key));
    if first {
        debug!(host = std::any::type_name::<T>(), "applying extension");
        extension(target, config);
    }
    target
}

/// Whether `extension` has been applied to host type `T` on this thread.
#[must_use]
pub fn is_applied<T: 'static, C>(extension: Extension<T, C>) -> bool {
    let key = (TypeId::of::<T>(), extension as usize);
    APPLIED.with(|applied| applied.borrow().contains(&key))
}
