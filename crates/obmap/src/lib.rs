#![forbid(unsafe_code)]

//! Batteries-included facade for the `obmap` observable container.
//!
//! Re-exports the container core (`obmap-core`) and the synchronous emitter
//! backend (`obmap-emitter`) under one roof:
//!
//! ```
//! use std::rc::Rc;
//! use obmap::{ObservableMap, attach};
//!
//! let map: ObservableMap<String> = ObservableMap::new();
//! let emitter = attach(&map);
//! emitter.on("add", Rc::new(|change| {
//!     println!("{} = {:?}", change.key, change.element);
//! }));
//!
//! map.set("greeting", "hi".to_string());
//! map.dispose();
//! ```

pub use obmap_core::{
    Change, ChangeKind, Context, EmitHook, Extension, Handler, HookOverride, NotifyHooks, OnHook,
    ObservableMap, RemoveAllListenersHook, RemoveListenerHook, SharedElements, apply, is_applied,
};
pub use obmap_emitter::{Emitter, attach, install};

/// The extension protocol module, for `extend::apply` call sites that prefer
/// the qualified path.
pub use obmap_core::extend;
