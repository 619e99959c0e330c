//! [`Engine`] over a C function table

use std::collections::HashMap;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_int;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use webbind_core::{BindResult, Bridge, BridgeError, Completion, Engine, Handle, SizeHint, Status};

use crate::api::EngineApi;
use crate::error::{FfiError, FfiResult};
use crate::loader::EngineLibrary;
use crate::thunk::{webbind_binding_thunk, webbind_dispatch_thunk, BindingHost};

/// A native window: the function table plus the pointer it was created with
#[derive(Clone, Copy)]
pub(crate) struct RawWindow {
    api: *const EngineApi,
    w: *mut c_void,
}

impl RawWindow {
    fn api(&self) -> &EngineApi {
        // SAFETY: checked non-null at creation and kept alive by the owner
        unsafe { &*self.api }
    }

    /// Settle a script call
    pub(crate) fn complete(&self, id: &CStr, completion: &Completion) {
        let (status, payload) = match CString::new(completion.payload.as_str()) {
            Ok(payload) => (completion.status, payload),
            Err(_) => {
                let fallback = Completion::error("result contains a NUL byte");
                (fallback.status, to_c(&fallback.payload))
            }
        };
        // SAFETY: `w` is live and both strings outlive the call
        unsafe {
            (self.api().complete)(self.w, id.as_ptr(), status.code() as c_int, payload.as_ptr())
        };
    }
}

fn to_c(s: &str) -> CString {
    // Error payloads are JSON-encoded, so NUL appears escaped
    CString::new(s).unwrap_or_default()
}

/// Engine implemented by a native library through [`EngineApi`]
pub struct ExternEngine {
    raw: RawWindow,
    hosts: Mutex<HashMap<String, Box<BindingHost>>>,
    // True once destroyed. Cross-thread entries hold the read guard over
    // the native call so `w` cannot be freed under them.
    destroyed: RwLock<bool>,
    library: Option<Arc<EngineLibrary>>,
}

// SAFETY: the engine contract makes `dispatch` and `terminate` callable from
// any thread, and both are serialized against `destroy` by `destroyed`.
// Every other entry is reached through `Webview`, which cannot leave the
// thread that created it. `Proxy` only exposes `schedule` and `terminate`
// here, since `ExternEngine` is not a `SharedEngine`.
unsafe impl Send for ExternEngine {}
unsafe impl Sync for ExternEngine {}

impl ExternEngine {
    /// Create a window through `api`.
    ///
    /// # Safety
    ///
    /// `api` must be null or point to a table that stays valid for the life
    /// of the engine and whose functions honour the contract in
    /// [`crate::api`]. `parent` must be null or a native window the engine
    /// accepts.
    pub unsafe fn create(api: *const EngineApi, debug: bool, parent: *mut c_void) -> FfiResult<Self> {
        if api.is_null() {
            return Err(FfiError::NullApi);
        }
        let w = ((*api).create)(debug as c_int, parent);
        if w.is_null() {
            return Err(FfiError::CreateFailed);
        }
        let devtools = debug;
        tracing::debug!(devtools, "native window created");
        Ok(Self {
            raw: RawWindow { api, w },
            hosts: Mutex::new(HashMap::new()),
            destroyed: RwLock::new(false),
            library: None,
        })
    }

    pub(crate) fn keep_alive(mut self, library: Arc<EngineLibrary>) -> Self {
        self.library = Some(library);
        self
    }

    /// Library backing this engine, if it was loaded from one
    pub fn library(&self) -> Option<&Arc<EngineLibrary>> {
        self.library.as_ref()
    }

    /// Names currently bound, sorted
    pub fn bound_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.hosts.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether the native window has been destroyed
    pub fn is_destroyed(&self) -> bool {
        *self.destroyed.read()
    }

    fn api(&self) -> &EngineApi {
        self.raw.api()
    }

    fn with_c_str(&self, what: &str, s: &str, f: impl FnOnce(&CStr)) {
        match CString::new(s) {
            Ok(c) => f(&c),
            Err(_) => tracing::warn!(what, "argument contains a NUL byte; call dropped"),
        }
    }
}

impl Engine for ExternEngine {
    fn run(&self) {
        // SAFETY: `w` is live until destroy
        unsafe { (self.api().run)(self.raw.w) }
    }

    fn terminate(&self) {
        let destroyed = self.destroyed.read();
        if *destroyed {
            return;
        }
        unsafe { (self.api().terminate)(self.raw.w) }
    }

    fn destroy(&self) {
        let mut destroyed = self.destroyed.write();
        if *destroyed {
            return;
        }
        *destroyed = true;
        unsafe { (self.api().destroy)(self.raw.w) }
        drop(destroyed);
        // The engine can no longer call a binding thunk, so hosts can go
        self.hosts.lock().clear();
        tracing::debug!("native window destroyed");
    }

    fn window(&self) -> *mut c_void {
        unsafe { (self.api().get_window)(self.raw.w) }
    }

    fn navigate(&self, url: &str) {
        self.with_c_str("url", url, |c| unsafe {
            (self.api().navigate)(self.raw.w, c.as_ptr())
        });
    }

    fn set_title(&self, title: &str) {
        self.with_c_str("title", title, |c| unsafe {
            (self.api().set_title)(self.raw.w, c.as_ptr())
        });
    }

    fn set_size(&self, width: i32, height: i32, hint: SizeHint) {
        unsafe { (self.api().set_size)(self.raw.w, width, height, hint.code()) }
    }

    fn init_script(&self, js: &str) {
        self.with_c_str("init", js, |c| unsafe { (self.api().init)(self.raw.w, c.as_ptr()) });
    }

    fn eval_script(&self, js: &str) {
        self.with_c_str("eval", js, |c| unsafe { (self.api().eval)(self.raw.w, c.as_ptr()) });
    }

    fn schedule(&self, bridge: Arc<Bridge>, handle: Handle) {
        let destroyed = self.destroyed.read();
        if *destroyed {
            tracing::warn!(handle = %handle, "dispatch after destroy dropped");
            bridge.table().remove(handle);
            return;
        }
        // Reclaimed by the dispatch thunk
        let host = Arc::into_raw(bridge) as *mut c_void;
        unsafe {
            (self.api().dispatch)(self.raw.w, webbind_dispatch_thunk, host, handle.as_raw())
        }
    }

    fn expose_binding(&self, name: &str, bridge: Arc<Bridge>, handle: Handle) -> BindResult<()> {
        let c_name = CString::new(name)
            .map_err(|_| BridgeError::configuration("binding name contains a NUL byte"))?;
        if self.hosts.lock().contains_key(name) {
            self.unexpose_binding(name);
        }

        let host = Box::new(BindingHost {
            bridge,
            window: self.raw,
        });
        let host_ptr = &*host as *const BindingHost as *mut c_void;
        unsafe {
            (self.api().bind)(
                self.raw.w,
                c_name.as_ptr(),
                webbind_binding_thunk,
                host_ptr,
                handle.as_raw(),
            )
        }
        self.hosts.lock().insert(name.to_string(), host);
        Ok(())
    }

    fn unexpose_binding(&self, name: &str) {
        self.with_c_str("unbind", name, |c| unsafe {
            (self.api().unbind)(self.raw.w, c.as_ptr())
        });
        self.hosts.lock().remove(name);
    }

    fn complete_binding(&self, id: &str, status: Status, payload: &str) {
        self.with_c_str("id", id, |c| {
            self.raw.complete(
                c,
                &Completion {
                    status,
                    payload: payload.to_string(),
                },
            )
        });
    }
}

impl Drop for ExternEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}
