#![forbid(unsafe_code)]

//! Glue binding an [`Emitter`] to the four-slot notification hook interface.
//!
//! Two entry points:
//!
//! - [`install`] wires an emitter into a whole [`Context`]; every container
//!   resolving through that context shares it. Apply through
//!   [`obmap_core::extend::apply`] so defensive re-initialization cannot
//!   double-configure.
//! - [`attach`] gives a single container its own emitter via a
//!   [`HookOverride`], leaving sibling containers on the same context
//!   untouched.

use std::rc::Rc;

use tracing::debug;

use obmap_core::config::{Context, HookOverride, NotifyHooks};
use obmap_core::map::ObservableMap;

use crate::emitter::Emitter;

impl<V: 'static> Emitter<V> {
    /// A full hook record with all four slots bound to this emitter.
    #[must_use]
    pub fn hooks(self: &Rc<Self>) -> NotifyHooks<V> {
        let emit = Rc::clone(self);
        let on = Rc::clone(self);
        let off = Rc::clone(self);
        let clear = Rc::clone(self);
        NotifyHooks {
            emit: Rc::new(move |event, change| emit.emit(event, &change)),
            on: Rc::new(move |event, handler| on.on(event, handler)),
            remove_listener: Rc::new(move |event, handler| off.remove_listener(event, handler)),
            remove_all_listeners: Rc::new(move || clear.remove_all_listeners()),
        }
    }
}

/// Plugin: configure `context` with emitter-backed hooks.
///
/// Passing a configuration emitter reuses it; otherwise a fresh one is
/// created. Meant to be applied with [`obmap_core::extend::apply`], which
/// guarantees the context type is wired at most once per thread no matter
/// how many initialization paths call it:
///
/// ```
/// use obmap_core::{Context, extend};
/// use obmap_emitter::install;
///
/// let mut context: Context<String> = Context::new();
/// extend::apply(&mut context, install, None);
/// extend::apply(&mut context, install, None); // no-op, listeners survive
/// ```
///
/// Note that the emitter (and so the listener set) is shared by every
/// container resolving through `context`; disposing any one of them clears
/// it. Use [`attach`] when containers need independent listener sets.
pub fn install<V: Clone + PartialEq + 'static>(
    context: &mut Context<V>,
    emitter: Option<&Rc<Emitter<V>>>,
) {
    let emitter = emitter.map_or_else(|| Rc::new(Emitter::new()), Rc::clone);
    debug!("installing emitter-backed notification hooks");
    context.configure(emitter.hooks());
}

/// Give `map` its own emitter, installed as a per-container hook override.
///
/// Returns the emitter so callers can subscribe; this is the instance-level
/// surfacing of `on` / `remove_listener` the container core itself never
/// requires. Disposing `map` clears exactly this emitter.
pub fn attach<V: Clone + PartialEq + 'static>(map: &ObservableMap<V>) -> Rc<Emitter<V>> {
    let emitter = Rc::new(Emitter::new());
    map.override_hooks(HookOverride::from(emitter.hooks()));
    emitter
}
