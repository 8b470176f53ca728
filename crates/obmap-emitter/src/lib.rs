#![forbid(unsafe_code)]

//! Synchronous event-emitter backend for the observable container.
//!
//! The container core only knows the four-slot notification hook interface;
//! this crate supplies a concrete backend behind it:
//! - [`Emitter`]: a minimal per-event-name handler registry with inline,
//!   registration-ordered delivery
//! - [`install`]: a plugin wiring an emitter into a whole
//!   [`Context`](obmap_core::Context) (apply via
//!   [`obmap_core::extend::apply`] for once-only semantics)
//! - [`attach`]: a per-container emitter installed as a hook override

/// The emitter itself.
pub mod emitter;
/// Hook bindings and the context plugin.
pub mod plugin;

pub use emitter::Emitter;
pub use plugin::{attach, install};
