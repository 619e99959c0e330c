//! Binding bridge
//!
//! [`Bridge::register`] validates a host function, stores its adapter in the
//! handle table and asks the engine to expose it under a script name. Each
//! script call comes back through [`Bridge::serve`] with the engine's request
//! id, which is echoed unchanged into [`Engine::complete_binding`].

use std::sync::Arc;

use crate::bridge::Bridge;
use crate::engine::{Completion, Engine};
use crate::error::{BindResult, BridgeError};
use crate::handle::{Entry, Handle};
use crate::invoke::{Adapter, IntoBinding};

impl Bridge {
    /// Bind `f` to the script name `name`.
    ///
    /// Fails with [`BridgeError::Configuration`] when `f`'s shape cannot be
    /// served, or with the engine's error when it refuses the name. Nothing
    /// stays allocated or exposed in either case.
    pub fn register<E, F, Args>(self: &Arc<Self>, engine: &E, name: &str, f: F) -> BindResult<Handle>
    where
        E: Engine + ?Sized,
        F: IntoBinding<Args>,
        Args: 'static,
    {
        let adapter = Adapter::new(f)?;
        let signature = *adapter.signature();
        let handle = self.table.allocate(Entry::Binding(Arc::new(adapter)));
        if let Err(e) = engine.expose_binding(name, Arc::clone(self), handle) {
            self.table.remove_binding(handle);
            tracing::warn!(name, error = %e, "engine refused binding");
            return Err(e);
        }
        tracing::debug!(name, handle = %handle, ?signature, "binding registered");
        Ok(handle)
    }

    /// Run the binding stored under `handle` against `request`.
    ///
    /// Every call failure is folded into the returned [`Completion`]. The
    /// only error is an unknown handle.
    pub fn call_binding(&self, handle: Handle, request: &str) -> BindResult<Completion> {
        let adapter = self
            .table
            .binding(handle)
            .ok_or(BridgeError::UnknownHandle(handle))?;
        Ok(adapter.complete(request))
    }

    /// Serve one script call and settle it on the engine under `id`
    pub fn serve<E>(&self, engine: &E, id: &str, request: &str, handle: Handle) -> BindResult<()>
    where
        E: Engine + ?Sized,
    {
        let completion = self.call_binding(handle, request)?;
        tracing::trace!(id, handle = %handle, ok = completion.is_ok(), "binding served");
        engine.complete_binding(id, completion.status, &completion.payload);
        Ok(())
    }

    /// Drop the binding stored under `handle`. Returns false if there was none.
    pub fn unregister(&self, handle: Handle) -> bool {
        let removed = self.table.remove_binding(handle).is_some();
        if removed {
            tracing::debug!(handle = %handle, "binding unregistered");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Status;
    use crate::invoke::Variadic;
    use crate::testing::RecordingEngine;

    fn echo(s: String, _n: i64) -> Result<String, String> {
        Ok(s)
    }

    #[test]
    fn test_register_exposes_name() {
        let bridge = Bridge::new();
        let engine = RecordingEngine::default();

        let handle = bridge.register(&engine, "echo", echo).unwrap();
        assert_eq!(*engine.exposed.lock(), vec![("echo".to_string(), handle)]);
        assert!(bridge.table().binding(handle).is_some());
    }

    #[test]
    fn test_serve_echoes_id() {
        let bridge = Bridge::new();
        let engine = RecordingEngine::default();
        let handle = bridge.register(&engine, "echo", echo).unwrap();

        bridge.serve(&engine, "17", r#"["a", 3]"#, handle).unwrap();
        bridge.serve(&engine, "18", r#"["a"]"#, handle).unwrap();

        let completed = engine.completed.lock();
        assert_eq!(completed[0], ("17".to_string(), Status::Ok, r#""a""#.to_string()));
        assert_eq!(completed[1].0, "18");
        assert_eq!(completed[1].1, Status::Error);

        // Bindings persist across calls
        assert!(bridge.table().contains(handle));
    }

    #[test]
    fn test_variadic_binding() {
        let bridge = Bridge::new();
        let engine = RecordingEngine::default();
        let handle = bridge
            .register(&engine, "sum", |_s: String, n: Variadic<i64>| -> Result<i64, String> {
                Ok(n.iter().sum())
            })
            .unwrap();

        let c = bridge.call_binding(handle, r#"["x", 1, 2, 3]"#).unwrap();
        assert_eq!(c.status, Status::Ok);
        assert_eq!(c.payload, "6");
    }

    #[test]
    fn test_rejected_shape_registers_nothing() {
        let bridge = Bridge::new();
        let engine = RecordingEngine::default();

        let err = bridge
            .register(&engine, "triple", |n: i32| (n, n, n))
            .unwrap_err();
        assert!(matches!(err, BridgeError::Configuration(_)));
        assert!(bridge.table().is_empty());
        assert!(engine.exposed.lock().is_empty());
    }

    #[test]
    fn test_refused_name_is_rolled_back() {
        let bridge = Bridge::new();
        let engine = RecordingEngine::default();

        let err = bridge.register(&engine, "bad\0name", || 1).unwrap_err();
        assert!(matches!(err, BridgeError::Configuration(_)));
        assert!(bridge.table().is_empty());
        assert!(engine.exposed.lock().is_empty());
    }

    #[test]
    fn test_unknown_handle() {
        let bridge = Bridge::new();
        let engine = RecordingEngine::default();

        let err = bridge
            .serve(&engine, "1", "[]", Handle::from_raw(99))
            .unwrap_err();
        assert!(err.is_contract_violation());
        assert!(engine.completed.lock().is_empty());
    }

    #[test]
    fn test_unregister() {
        let bridge = Bridge::new();
        let engine = RecordingEngine::default();
        let handle = bridge.register(&engine, "noop", || {}).unwrap();

        assert!(bridge.unregister(handle));
        assert!(!bridge.unregister(handle));
        assert!(bridge.call_binding(handle, "[]").is_err());
    }
}
