//! The C function table a native engine library exports
//!
//! A library provides one symbol, `webbind_engine_api`, returning a pointer
//! to a static [`EngineApi`]. Every entry takes the opaque window pointer
//! `w` returned by `create`. Strings are NUL-terminated UTF-8 and are only
//! borrowed for the duration of the call.
//!
//! ```c
//! typedef void (*webbind_dispatch_fn)(void *host, uintptr_t handle);
//! typedef void (*webbind_binding_fn)(void *host, const char *id,
//!                                    const char *request, uintptr_t handle);
//! ```
//!
//! `dispatch` and `terminate` must be safe to call from any thread. All
//! other entries are only called on the thread that runs `run`.

use std::ffi::c_void;
use std::os::raw::{c_char, c_int};

/// Callback for a posted dispatch. `host` and `handle` are passed back
/// exactly as given to [`EngineApi::dispatch`].
pub type DispatchThunk = unsafe extern "C" fn(host: *mut c_void, handle: usize);

/// Callback for a script call to a bound name. `id` identifies the pending
/// promise and must be passed back to [`EngineApi::complete`].
pub type BindingThunk = unsafe extern "C" fn(
    host: *mut c_void,
    id: *const c_char,
    request: *const c_char,
    handle: usize,
);

/// Name of the symbol a native engine library exports
pub const ENGINE_API_SYMBOL: &str = "webbind_engine_api";

/// Signature of the exported [`ENGINE_API_SYMBOL`]
pub type EngineApiFn = unsafe extern "C" fn() -> *const EngineApi;

/// Engine entry points
#[repr(C)]
#[derive(Clone, Copy)]
pub struct EngineApi {
    /// Create a window. `window` is an optional parent; returns null on failure.
    pub create: unsafe extern "C" fn(debug: c_int, window: *mut c_void) -> *mut c_void,
    pub destroy: unsafe extern "C" fn(w: *mut c_void),
    pub run: unsafe extern "C" fn(w: *mut c_void),
    pub terminate: unsafe extern "C" fn(w: *mut c_void),
    pub get_window: unsafe extern "C" fn(w: *mut c_void) -> *mut c_void,
    pub navigate: unsafe extern "C" fn(w: *mut c_void, url: *const c_char),
    pub set_title: unsafe extern "C" fn(w: *mut c_void, title: *const c_char),
    /// `hint` is a [`webbind_core::SizeHint`] code
    pub set_size: unsafe extern "C" fn(w: *mut c_void, width: c_int, height: c_int, hint: c_int),
    pub init: unsafe extern "C" fn(w: *mut c_void, js: *const c_char),
    pub eval: unsafe extern "C" fn(w: *mut c_void, js: *const c_char),
    /// Call `thunk(host, handle)` on the UI thread, in FIFO order
    pub dispatch: unsafe extern "C" fn(
        w: *mut c_void,
        thunk: DispatchThunk,
        host: *mut c_void,
        handle: usize,
    ),
    /// Expose `name` to script; each call invokes `thunk(host, id, request, handle)`
    pub bind: unsafe extern "C" fn(
        w: *mut c_void,
        name: *const c_char,
        thunk: BindingThunk,
        host: *mut c_void,
        handle: usize,
    ),
    pub unbind: unsafe extern "C" fn(w: *mut c_void, name: *const c_char),
    /// Settle the call `id`: status 0 resolves with `result`, -1 rejects with it
    pub complete: unsafe extern "C" fn(
        w: *mut c_void,
        id: *const c_char,
        status: c_int,
        result: *const c_char,
    ),
}
