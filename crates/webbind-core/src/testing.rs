//! Engine double for unit tests

use std::ffi::c_void;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::bridge::Bridge;
use crate::engine::{Engine, SizeHint, Status};
use crate::error::{BindResult, BridgeError};
use crate::handle::Handle;

/// Records what the bridge asks of it and runs nothing on its own
#[derive(Default)]
pub(crate) struct RecordingEngine {
    pub queued: Mutex<Vec<Handle>>,
    pub exposed: Mutex<Vec<(String, Handle)>>,
    pub completed: Mutex<Vec<(String, Status, String)>>,
    pub calls: Mutex<Vec<String>>,
}

impl RecordingEngine {
    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

impl Engine for RecordingEngine {
    fn run(&self) {
        self.record("run".into());
    }
    fn terminate(&self) {
        self.record("terminate".into());
    }
    fn destroy(&self) {
        self.record("destroy".into());
    }
    fn window(&self) -> *mut c_void {
        std::ptr::null_mut()
    }
    fn navigate(&self, url: &str) {
        self.record(format!("navigate {url}"));
    }
    fn set_title(&self, title: &str) {
        self.record(format!("title {title}"));
    }
    fn set_size(&self, width: i32, height: i32, hint: SizeHint) {
        self.record(format!("size {width}x{height} {hint:?}"));
    }
    fn init_script(&self, js: &str) {
        self.record(format!("init {js}"));
    }
    fn eval_script(&self, js: &str) {
        self.record(format!("eval {js}"));
    }
    fn schedule(&self, _bridge: Arc<Bridge>, handle: Handle) {
        self.queued.lock().push(handle);
    }
    fn expose_binding(&self, name: &str, _bridge: Arc<Bridge>, handle: Handle) -> BindResult<()> {
        // Same rule as a C engine: names cross as NUL-terminated strings
        if name.contains('\0') {
            return Err(BridgeError::configuration("binding name contains a NUL byte"));
        }
        self.exposed.lock().push((name.to_string(), handle));
        Ok(())
    }
    fn unexpose_binding(&self, name: &str) {
        self.exposed.lock().retain(|(n, _)| n != name);
    }
    fn complete_binding(&self, id: &str, status: Status, payload: &str) {
        self.completed
            .lock()
            .push((id.to_string(), status, payload.to_string()));
    }
}
