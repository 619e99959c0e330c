//! Entry points the native engine calls back into
//!
//! Neither thunk may unwind into C. Panics from host code are caught and
//! logged; a handle the bridge does not know aborts the process, since the
//! engine and the bridge no longer agree on what is live.

use std::any::Any;
use std::borrow::Cow;
use std::ffi::{c_void, CStr};
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use webbind_core::{Bridge, Completion, Handle};

use crate::engine::RawWindow;

/// Context handed to the engine with each bound name
pub(crate) struct BindingHost {
    pub(crate) bridge: Arc<Bridge>,
    pub(crate) window: RawWindow,
}

/// Deliver a posted dispatch.
///
/// # Safety
///
/// `host` must be the pointer passed alongside `handle` to
/// [`EngineApi::dispatch`](crate::api::EngineApi::dispatch), and each such
/// pair may be delivered at most once.
#[no_mangle]
pub unsafe extern "C" fn webbind_dispatch_thunk(host: *mut c_void, handle: usize) {
    let handle = Handle::from_raw(handle);
    if host.is_null() {
        contract_violation(handle, "dispatch delivered without a host");
    }

    // Reclaims the reference leaked by `ExternEngine::schedule`
    let bridge = Arc::from_raw(host as *const Bridge);
    match panic::catch_unwind(AssertUnwindSafe(|| bridge.deliver(handle))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => contract_violation(handle, &e.to_string()),
        Err(payload) => {
            tracing::warn!(handle = %handle, "dispatched closure panicked: {}", panic_message(&*payload));
        }
    }
}

/// Serve a script call to a bound name.
///
/// # Safety
///
/// `host` must be the pointer registered with `handle` through
/// [`EngineApi::bind`](crate::api::EngineApi::bind) and not yet unbound.
/// `id` and `request` must be null or valid C strings for the duration of
/// the call.
#[no_mangle]
pub unsafe extern "C" fn webbind_binding_thunk(
    host: *mut c_void,
    id: *const c_char,
    request: *const c_char,
    handle: usize,
) {
    let handle = Handle::from_raw(handle);
    if host.is_null() || id.is_null() {
        contract_violation(handle, "binding called without a host or call id");
    }

    let host = &*(host as *const BindingHost);
    let id = CStr::from_ptr(id);
    let request = if request.is_null() {
        Cow::Borrowed("")
    } else {
        CStr::from_ptr(request).to_string_lossy()
    };

    let completion = match panic::catch_unwind(AssertUnwindSafe(|| {
        host.bridge.call_binding(handle, &request)
    })) {
        Ok(Ok(completion)) => completion,
        Ok(Err(e)) => contract_violation(handle, &e.to_string()),
        Err(payload) => {
            let message = format!("function panicked: {}", panic_message(&*payload));
            tracing::warn!(handle = %handle, "{message}");
            Completion::error(&message)
        }
    };
    host.window.complete(id, &completion);
}

fn contract_violation(handle: Handle, reason: &str) -> ! {
    tracing::error!(handle = %handle, reason, "engine delivered a handle the bridge does not hold");
    std::process::abort()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "Unknown panic"
    }
}
