//! Native engine collaborator
//!
//! The rendering engine, its windowing and its event loop live outside this
//! crate. [`Engine`] is the surface the bridge needs from it. Everything but
//! [`Engine::terminate`], [`Engine::schedule`] and
//! [`Engine::complete_binding`] must be called on the UI thread.

use std::ffi::c_void;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::bridge::Bridge;
use crate::error::{BindResult, BridgeError};
use crate::handle::Handle;

/// Window sizing hint passed to [`Engine::set_size`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum SizeHint {
    /// Width and height are the default size
    #[default]
    None = 0,
    /// Width and height are minimum bounds
    Min = 1,
    /// Width and height are maximum bounds
    Max = 2,
    /// Window size can not be changed by the user
    Fixed = 3,
}

impl SizeHint {
    /// Native code for this hint
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Out-of-band status of a binding completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Status {
    /// Payload is the JSON-encoded return value
    Ok = 0,
    /// Payload is the JSON-encoded error message
    Error = -1,
}

impl Status {
    /// Native code for this status
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Result of one script-side call, as handed back to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Whether the call succeeded
    pub status: Status,
    /// Exactly one JSON value
    pub payload: String,
}

impl Completion {
    /// Successful completion carrying `value`
    pub fn ok(value: &Value) -> Self {
        match serde_json::to_string(value) {
            Ok(payload) => Completion {
                status: Status::Ok,
                payload,
            },
            Err(e) => Completion::error(&e.to_string()),
        }
    }

    /// Failed completion carrying `message` as a JSON string
    pub fn error(message: &str) -> Self {
        Completion {
            status: Status::Error,
            // Encoding a str cannot fail
            payload: serde_json::to_string(message).unwrap_or_else(|_| String::from("\"\"")),
        }
    }

    /// Fold an invocation result into a completion
    pub fn from_result(result: Result<Value, BridgeError>) -> Self {
        match result {
            Ok(value) => Completion::ok(&value),
            Err(e) => Completion::error(&e.to_string()),
        }
    }

    /// True if the call succeeded
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

/// The native web engine, seen from the bridge.
///
/// Implementations call back into the [`Bridge`] they were given:
/// [`Bridge::deliver`] for a scheduled handle and [`Bridge::call_binding`]
/// when script invokes an exposed name.
pub trait Engine: Send + Sync {
    /// Run the event loop on the calling thread until terminated
    fn run(&self);

    /// Stop the event loop. Safe from any thread.
    fn terminate(&self);

    /// Destroy the window. The engine must not be used afterwards.
    fn destroy(&self);

    /// Native window pointer (GtkWindow, NSWindow or HWND)
    fn window(&self) -> *mut c_void;

    /// Navigate to `url`
    fn navigate(&self, url: &str);

    /// Update the window title
    fn set_title(&self, title: &str);

    /// Update the window size
    fn set_size(&self, width: i32, height: i32, hint: SizeHint);

    /// Inject `js` into every page before `window.onload`
    fn init_script(&self, js: &str);

    /// Evaluate `js` asynchronously, discarding the result
    fn eval_script(&self, js: &str);

    /// Queue `handle` for delivery on the UI thread. Safe from any thread.
    ///
    /// Handles must be delivered in the order they were scheduled.
    fn schedule(&self, bridge: Arc<Bridge>, handle: Handle);

    /// Expose `name` to script, routed to `handle`.
    ///
    /// On error nothing was installed and the bridge releases `handle`.
    fn expose_binding(&self, name: &str, bridge: Arc<Bridge>, handle: Handle) -> BindResult<()>;

    /// Withdraw a name previously exposed with [`Engine::expose_binding`]
    fn unexpose_binding(&self, name: &str);

    /// Settle the pending script call identified by `id`
    fn complete_binding(&self, id: &str, status: Status, payload: &str);
}

/// An [`Engine`] whose every entry point may be called from any thread.
///
/// Only such engines are reachable through [`Proxy::engine`](crate::Proxy::engine).
pub trait SharedEngine: Engine {}
