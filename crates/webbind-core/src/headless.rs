//! In-process engine without a window
//!
//! [`HeadlessEngine`] runs a real single-threaded event loop: [`Engine::run`]
//! drains a FIFO queue on the calling thread until [`Engine::terminate`].
//! Script is not executed; instead [`HeadlessEngine::call`] plays the part of
//! page script invoking a bound name, from any thread, and hands back a
//! receiver for the completion.

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::bridge::Bridge;
use crate::engine::{Completion, Engine, SharedEngine, SizeHint, Status};
use crate::error::BindResult;
use crate::handle::Handle;

enum Event {
    Dispatch(Arc<Bridge>, Handle),
    Call {
        name: String,
        id: String,
        request: String,
    },
    Terminate,
}

struct Exposed {
    bridge: Arc<Bridge>,
    handle: Handle,
}

#[derive(Default)]
struct State {
    title: String,
    size: (i32, i32, SizeHint),
    url: Option<String>,
    init_scripts: Vec<String>,
    evaluated: Vec<String>,
    bindings: HashMap<String, Exposed>,
    pending: HashMap<String, Sender<Completion>>,
    destroyed: bool,
}

/// Engine with an event loop and no renderer
pub struct HeadlessEngine {
    debug: bool,
    tx: Sender<Event>,
    rx: Receiver<Event>,
    state: Mutex<State>,
    next_id: AtomicU64,
}

impl HeadlessEngine {
    /// Create a headless engine
    pub fn new(debug: bool) -> Self {
        let (tx, rx) = channel::unbounded();
        Self {
            debug,
            tx,
            rx,
            state: Mutex::new(State::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Whether developer tools were requested
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Call the bound `name` as page script would, with `request` as the
    /// JSON argument array. The call is served on the UI thread.
    pub fn call(&self, name: &str, request: &str) -> Receiver<Completion> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        let (tx, rx) = channel::bounded(1);
        self.state.lock().pending.insert(id.clone(), tx);
        self.send(Event::Call {
            name: name.to_string(),
            id,
            request: request.to_string(),
        });
        rx
    }

    /// Process queued events without blocking. Returns false once a
    /// terminate request has been consumed.
    pub fn pump(&self) -> bool {
        while let Ok(event) = self.rx.try_recv() {
            if !self.handle(event) {
                return false;
            }
        }
        true
    }

    /// Current window title
    pub fn title(&self) -> String {
        self.state.lock().title.clone()
    }

    /// Current window size and hint
    pub fn size(&self) -> (i32, i32, SizeHint) {
        self.state.lock().size
    }

    /// Last navigated URL
    pub fn url(&self) -> Option<String> {
        self.state.lock().url.clone()
    }

    /// Scripts injected with [`Engine::init_script`], in order
    pub fn init_scripts(&self) -> Vec<String> {
        self.state.lock().init_scripts.clone()
    }

    /// Scripts passed to [`Engine::eval_script`], in order
    pub fn evaluated(&self) -> Vec<String> {
        self.state.lock().evaluated.clone()
    }

    /// Names currently exposed to script, sorted
    pub fn bindings(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().bindings.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether [`Engine::destroy`] has been called
    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    fn send(&self, event: Event) {
        // The receiver lives as long as self
        let _ = self.tx.send(event);
    }

    fn handle(&self, event: Event) -> bool {
        match event {
            Event::Dispatch(bridge, handle) => {
                if let Err(e) = bridge.deliver(handle) {
                    tracing::error!(error = %e, "dispatch delivery failed");
                    panic!("{e}");
                }
            }
            Event::Call { name, id, request } => {
                let target = self
                    .state
                    .lock()
                    .bindings
                    .get(&name)
                    .map(|exposed| (Arc::clone(&exposed.bridge), exposed.handle));
                match target {
                    Some((bridge, handle)) => {
                        if let Err(e) = bridge.serve(self, &id, &request, handle) {
                            tracing::error!(error = %e, name = %name, "binding delivery failed");
                            panic!("{e}");
                        }
                    }
                    None => {
                        let message = format!("{name} is not a function");
                        let c = Completion::error(&message);
                        self.complete_binding(&id, c.status, &c.payload);
                    }
                }
            }
            Event::Terminate => return false,
        }
        true
    }
}

// Channels and a mutex back every entry point
impl SharedEngine for HeadlessEngine {}

impl Engine for HeadlessEngine {
    fn run(&self) {
        tracing::debug!("headless loop started");
        while let Ok(event) = self.rx.recv() {
            if !self.handle(event) {
                break;
            }
        }
        tracing::debug!("headless loop stopped");
    }

    fn terminate(&self) {
        self.send(Event::Terminate);
    }

    fn destroy(&self) {
        let mut state = self.state.lock();
        state.destroyed = true;
        state.bindings.clear();
    }

    fn window(&self) -> *mut c_void {
        std::ptr::null_mut()
    }

    fn navigate(&self, url: &str) {
        tracing::info!(url, "navigate");
        self.state.lock().url = Some(url.to_string());
    }

    fn set_title(&self, title: &str) {
        self.state.lock().title = title.to_string();
    }

    fn set_size(&self, width: i32, height: i32, hint: SizeHint) {
        self.state.lock().size = (width, height, hint);
    }

    fn init_script(&self, js: &str) {
        self.state.lock().init_scripts.push(js.to_string());
    }

    fn eval_script(&self, js: &str) {
        tracing::debug!(js, "eval");
        self.state.lock().evaluated.push(js.to_string());
    }

    fn schedule(&self, bridge: Arc<Bridge>, handle: Handle) {
        self.send(Event::Dispatch(bridge, handle));
    }

    fn expose_binding(&self, name: &str, bridge: Arc<Bridge>, handle: Handle) -> BindResult<()> {
        self.state
            .lock()
            .bindings
            .insert(name.to_string(), Exposed { bridge, handle });
        Ok(())
    }

    fn unexpose_binding(&self, name: &str) {
        self.state.lock().bindings.remove(name);
    }

    fn complete_binding(&self, id: &str, status: Status, payload: &str) {
        let pending = self.state.lock().pending.remove(id);
        match pending {
            Some(tx) => {
                let _ = tx.send(Completion {
                    status,
                    payload: payload.to_string(),
                });
            }
            None => tracing::warn!(id, "completion for unknown call"),
        }
    }
}
