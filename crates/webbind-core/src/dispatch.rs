//! Dispatch bridge
//!
//! [`Bridge::post`] hands a one-shot closure to the engine's UI-thread queue;
//! the engine later calls [`Bridge::deliver`] with the same handle. The entry
//! is removed before the closure runs, so a redelivered handle cannot run it
//! twice and a panicking closure leaves nothing behind.

use std::sync::Arc;

use crate::bridge::Bridge;
use crate::engine::Engine;
use crate::error::{BindResult, BridgeError};
use crate::handle::{Entry, Handle};

impl Bridge {
    /// Schedule `f` to run once on the UI thread. Returns without waiting.
    pub fn post<E, F>(self: &Arc<Self>, engine: &E, f: F) -> Handle
    where
        E: Engine + ?Sized,
        F: FnOnce() + Send + 'static,
    {
        let handle = self.table.allocate(Entry::Dispatch(Box::new(f)));
        tracing::debug!(handle = %handle, "dispatch posted");
        engine.schedule(Arc::clone(self), handle);
        handle
    }

    /// Run the closure posted under `handle`.
    ///
    /// Called by the engine on the UI thread. An unknown handle means the
    /// engine and the bridge disagree about what is live.
    pub fn deliver(&self, handle: Handle) -> BindResult<()> {
        let f = self
            .table
            .take_dispatch(handle)
            .ok_or(BridgeError::UnknownHandle(handle))?;
        tracing::trace!(handle = %handle, "dispatch delivered");
        f();
        Ok(())
    }
}
