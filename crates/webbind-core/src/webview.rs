//! Window handle for host code
//!
//! A [`Webview`] is tied to the thread that created it, which becomes the UI
//! thread: it is neither `Send` nor `Sync`. Work from other threads goes
//! through a [`Proxy`], which only offers operations that are safe off the
//! UI thread or that hop onto it via dispatch.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::c_void;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::bridge::Bridge;
use crate::config::WindowConfig;
use crate::engine::{Engine, SharedEngine, SizeHint};
use crate::error::{BindResult, BridgeError};
use crate::handle::Handle;
use crate::invoke::IntoBinding;

/// A native window running an embedded web engine
pub struct Webview<E: Engine + 'static> {
    engine: Arc<E>,
    bridge: Arc<Bridge>,
    bindings: RefCell<HashMap<String, Handle>>,
    // Pins the window to the UI thread
    _ui: PhantomData<*const ()>,
}

impl<E: Engine + 'static> Webview<E> {
    /// Wrap `engine` with a fresh bridge
    pub fn new(engine: E) -> Self {
        Self::with_bridge(engine, Bridge::new())
    }

    /// Wrap `engine`, sharing an existing bridge with other windows
    pub fn with_bridge(engine: E, bridge: Arc<Bridge>) -> Self {
        Self {
            engine: Arc::new(engine),
            bridge,
            bindings: RefCell::new(HashMap::new()),
            _ui: PhantomData,
        }
    }

    /// The underlying engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The bridge this window registers into
    pub fn bridge(&self) -> &Arc<Bridge> {
        &self.bridge
    }

    /// A thread-safe handle for use off the UI thread
    pub fn proxy(&self) -> Proxy<E> {
        Proxy {
            engine: Arc::clone(&self.engine),
            bridge: Arc::clone(&self.bridge),
        }
    }

    /// Apply title, size, init scripts and URL from `config`, in that order
    pub fn apply(&self, config: &WindowConfig) {
        self.set_title(&config.title);
        self.set_size(config.width, config.height, config.hint);
        for js in &config.init {
            self.init(js);
        }
        if let Some(url) = &config.url {
            self.navigate(url);
        }
    }

    /// Run the main loop until it is terminated
    pub fn run(&self) {
        self.engine.run();
    }

    /// Stop the main loop
    pub fn terminate(&self) {
        self.engine.terminate();
    }

    /// Post `f` to run on the UI thread at the next opportunity
    pub fn dispatch<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.bridge.post(self.engine.as_ref(), f);
    }

    /// Native window pointer
    pub fn window(&self) -> *mut c_void {
        self.engine.window()
    }

    /// Update the window title
    pub fn set_title(&self, title: &str) {
        self.engine.set_title(title);
    }

    /// Update the window size
    pub fn set_size(&self, width: i32, height: i32, hint: SizeHint) {
        self.engine.set_size(width, height, hint);
    }

    /// Navigate to `url`. Data URIs are accepted.
    pub fn navigate(&self, url: &str) {
        self.engine.navigate(url);
    }

    /// Inject `js` into every new page, ahead of `window.onload`
    pub fn init(&self, js: &str) {
        self.engine.init_script(js);
    }

    /// Evaluate `js` asynchronously. The result is discarded; use a binding
    /// to get values back.
    pub fn eval(&self, js: &str) {
        self.engine.eval_script(js);
    }

    /// Expose `f` to script as the global function `name`.
    ///
    /// Script calls return a promise that settles with the function's
    /// result or rejects with its error message.
    pub fn bind<F, Args>(&self, name: &str, f: F) -> BindResult<()>
    where
        F: IntoBinding<Args>,
        Args: 'static,
    {
        if self.bindings.borrow().contains_key(name) {
            return Err(BridgeError::DuplicateBinding(name.to_string()));
        }
        let handle = self.bridge.register(self.engine.as_ref(), name, f)?;
        self.bindings.borrow_mut().insert(name.to_string(), handle);
        Ok(())
    }

    /// Withdraw the binding `name` from script and release its handle
    pub fn unbind(&self, name: &str) -> BindResult<()> {
        let handle = self
            .bindings
            .borrow_mut()
            .remove(name)
            .ok_or_else(|| BridgeError::UnknownBinding(name.to_string()))?;
        self.engine.unexpose_binding(name);
        self.bridge.unregister(handle);
        Ok(())
    }

    /// Whether `name` is bound on this window
    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
    }
}

impl<E: Engine + 'static> Drop for Webview<E> {
    fn drop(&mut self) {
        for (_, handle) in self.bindings.get_mut().drain() {
            self.bridge.unregister(handle);
        }
        self.engine.destroy();
    }
}

/// Cross-thread handle to a [`Webview`]
pub struct Proxy<E: Engine + 'static> {
    engine: Arc<E>,
    bridge: Arc<Bridge>,
}

impl<E: Engine + 'static> Clone for Proxy<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            bridge: Arc::clone(&self.bridge),
        }
    }
}

impl<E: SharedEngine + 'static> Proxy<E> {
    /// The underlying engine. Only engines that are safe on every thread
    /// hand it out here.
    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: Engine + 'static> Proxy<E> {
    /// Post `f` to run on the UI thread
    pub fn dispatch<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.bridge.post(self.engine.as_ref(), f);
    }

    /// Stop the main loop
    pub fn terminate(&self) {
        self.engine.terminate();
    }

    /// Evaluate `js` on the UI thread
    pub fn eval(&self, js: impl Into<String>) {
        let js = js.into();
        let engine = Arc::clone(&self.engine);
        self.dispatch(move || engine.eval_script(&js));
    }

    /// Navigate on the UI thread
    pub fn navigate(&self, url: impl Into<String>) {
        let url = url.into();
        let engine = Arc::clone(&self.engine);
        self.dispatch(move || engine.navigate(&url));
    }

    /// Update the title on the UI thread
    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        let engine = Arc::clone(&self.engine);
        self.dispatch(move || engine.set_title(&title));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingEngine;

    #[test]
    fn test_apply_config_order() {
        let webview = Webview::new(RecordingEngine::default());
        let config = WindowConfig {
            title: "demo".into(),
            width: 640,
            height: 480,
            hint: SizeHint::Min,
            url: Some("https://example.com".into()),
            debug: false,
            init: vec!["setup()".into()],
        };
        webview.apply(&config);

        assert_eq!(
            *webview.engine().calls.lock(),
            vec![
                "title demo",
                "size 640x480 Min",
                "init setup()",
                "navigate https://example.com",
            ]
        );
    }

    #[test]
    fn test_duplicate_bind_rejected() {
        let webview = Webview::new(RecordingEngine::default());
        webview.bind("f", || 1).unwrap();

        let err = webview.bind("f", || 2).unwrap_err();
        assert!(matches!(err, BridgeError::DuplicateBinding(n) if n == "f"));
        assert_eq!(webview.bridge().table().len(), 1);
        assert_eq!(webview.engine().exposed.lock().len(), 1);
    }

    #[test]
    fn test_unbind() {
        let webview = Webview::new(RecordingEngine::default());
        webview.bind("f", || 1).unwrap();

        webview.unbind("f").unwrap();
        assert!(!webview.is_bound("f"));
        assert!(webview.bridge().table().is_empty());
        assert!(webview.engine().exposed.lock().is_empty());

        assert!(matches!(webview.unbind("f"), Err(BridgeError::UnknownBinding(_))));
    }

    #[test]
    fn test_invalid_bind_leaves_no_trace() {
        let webview = Webview::new(RecordingEngine::default());
        assert!(webview.bind("bad", |n: i32| (n, n, n)).is_err());
        assert!(!webview.is_bound("bad"));
        assert!(webview.bridge().table().is_empty());
    }

    #[test]
    fn test_refused_name_leaves_no_trace() {
        let webview = Webview::new(RecordingEngine::default());
        assert!(webview.bind("bad\0name", || 1).is_err());
        assert!(!webview.is_bound("bad\0name"));
        assert!(webview.bridge().table().is_empty());

        // The name is free for a later valid bind
        webview.bind("good", || 1).unwrap();
        assert_eq!(webview.bridge().table().len(), 1);
    }

    #[test]
    fn test_drop_releases_bindings() {
        let bridge = Bridge::new();
        {
            let webview = Webview::with_bridge(RecordingEngine::default(), Arc::clone(&bridge));
            webview.bind("a", || {}).unwrap();
            webview.bind("b", || {}).unwrap();
            assert_eq!(bridge.table().len(), 2);
        }
        assert!(bridge.table().is_empty());
    }

    #[test]
    fn test_proxy_eval_is_dispatched() {
        let webview = Webview::new(RecordingEngine::default());
        let proxy = webview.proxy();
        std::thread::spawn(move || proxy.eval("1 + 1")).join().unwrap();

        // Nothing runs until the engine delivers the dispatch
        assert!(webview.engine().calls.lock().is_empty());
        let queued = webview.engine().queued.lock().clone();
        assert_eq!(queued.len(), 1);

        webview.bridge().deliver(queued[0]).unwrap();
        assert_eq!(*webview.engine().calls.lock(), vec!["eval 1 + 1"]);
    }
}
