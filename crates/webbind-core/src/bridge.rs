//! Shared bridge state
//!
//! One [`Bridge`] is created per process (or per window group) and shared by
//! `Arc` between the host API and every engine callback. Its two halves live
//! in [`crate::dispatch`] and [`crate::binding`].

use std::sync::Arc;

use crate::handle::HandleTable;

/// Registry of every closure handed to native code
#[derive(Default)]
pub struct Bridge {
    pub(crate) table: HandleTable,
}

impl Bridge {
    /// Create a bridge with an empty handle table
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The handle table backing this bridge
    pub fn table(&self) -> &HandleTable {
        &self.table
    }
}
