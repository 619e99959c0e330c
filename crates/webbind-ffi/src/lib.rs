//! C ABI glue for native web engines
//!
//! A native engine library exports a table of C functions ([`EngineApi`]).
//! [`ExternEngine`] drives that table as a [`webbind_core::Engine`], and the
//! engine calls back through two exported thunks:
//!
//! - [`webbind_dispatch_thunk`] runs a posted closure on the UI thread
//! - [`webbind_binding_thunk`] serves a script call to a bound name
//!
//! The engine only ever sees opaque host pointers and numeric handles.
//! Closures stay on the Rust side, in the bridge's handle table.

pub mod api;
pub mod engine;
pub mod error;
pub mod loader;
pub mod thunk;

pub use api::{BindingThunk, DispatchThunk, EngineApi, EngineApiFn, ENGINE_API_SYMBOL};
pub use engine::ExternEngine;
pub use error::{FfiError, FfiResult};
pub use loader::{EngineLibrary, LoadError};
pub use thunk::{webbind_binding_thunk, webbind_dispatch_thunk};
