#![forbid(unsafe_code)]

//! Observable string-keyed container with pluggable change notification.
//!
//! This crate provides:
//! - [`ObservableMap`]: an ordered key/value store that reports every
//!   committed mutation (`add` / `remove`) through a configurable hook set
//! - [`NotifyHooks`] and [`Context`]: the four-slot notification hook
//!   record and the shared configuration it is resolved from
//! - [`HookOverride`]: per-container partial hook shadowing
//! - [`extend`]: at-most-once application of extension functions to any
//!   host type
//!
//! The core never depends on a concrete notification backend; backends plug
//! in through [`Context::configure`] (see the companion emitter crate for a
//! ready-made synchronous one).
//!
//! Everything here is single-threaded by construction (`Rc`/`RefCell`, not
//! `Send`/`Sync`); embed behind your runtime's own mutual exclusion if you
//! need cross-thread sharing.

/// Notification hook record, configuration contexts, per-container overrides.
pub mod config;
/// Change events delivered to the `emit` hook.
pub mod event;
/// Idempotent extension application for arbitrary host types.
pub mod extend;
/// The observable container itself.
pub mod map;

pub use config::{
    Context, EmitHook, HookOverride, NotifyHooks, OnHook, RemoveAllListenersHook,
    RemoveListenerHook,
};
pub use event::{Change, ChangeKind, Handler};
pub use extend::{Extension, apply, is_applied};
pub use map::{ObservableMap, SharedElements};
