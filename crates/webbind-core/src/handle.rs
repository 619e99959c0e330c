//! Handle table
//!
//! Native code never sees a host closure. It sees a [`Handle`], a small
//! integer that resolves to an [`Entry`] in a [`HandleTable`]. Dispatch and
//! binding entries share one namespace and one lock, so a handle resolves to
//! at most one entry of either kind.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::invoke::Adapter;

/// Opaque handle naming a registered callback across the native boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(usize);

impl Handle {
    /// Rebuild a handle from the integer native code passed back
    #[inline]
    pub const fn from_raw(raw: usize) -> Self {
        Handle(raw)
    }

    /// Integer form handed to native code (`uintptr_t` on the C side)
    #[inline]
    pub const fn as_raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single-shot closure scheduled onto the UI thread
pub type DispatchFn = Box<dyn FnOnce() + Send + 'static>;

/// A registered callback
pub enum Entry {
    /// Runs once, then its handle is released
    Dispatch(DispatchFn),
    /// Lives as long as the binding is registered
    Binding(Arc<Adapter>),
}

impl Entry {
    /// Kind of this entry
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Dispatch(_) => EntryKind::Dispatch,
            Entry::Binding(_) => EntryKind::Binding,
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Dispatch(_) => f.write_str("Entry::Dispatch(..)"),
            Entry::Binding(adapter) => f
                .debug_tuple("Entry::Binding")
                .field(adapter.signature())
                .finish(),
        }
    }
}

/// Entry kind, as reported by [`HandleTable::kind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// One-shot UI-thread closure
    Dispatch,
    /// Script-callable function
    Binding,
}

struct Slots {
    entries: HashMap<usize, Entry>,
    /// Next value to try; wraps around and skips occupied slots
    cursor: usize,
}

/// Thread-safe map from handle to registered callback.
///
/// Every operation is one critical section. The lock is never held while a
/// callback runs, so callbacks may register or dispatch further work.
pub struct HandleTable {
    slots: Mutex<Slots>,
}

impl HandleTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                entries: HashMap::new(),
                cursor: 0,
            }),
        }
    }

    /// Store an entry under the first free handle at or after the cursor.
    pub fn allocate(&self, entry: Entry) -> Handle {
        let mut slots = self.slots.lock();
        let mut raw = slots.cursor;
        while slots.entries.contains_key(&raw) {
            raw = raw.wrapping_add(1);
        }
        let kind = entry.kind();
        slots.entries.insert(raw, entry);
        slots.cursor = raw.wrapping_add(1);
        drop(slots);

        let handle = Handle(raw);
        tracing::trace!(handle = %handle, ?kind, "allocated");
        handle
    }

    /// Kind of the entry stored under `handle`, if any
    pub fn kind(&self, handle: Handle) -> Option<EntryKind> {
        self.slots.lock().entries.get(&handle.0).map(Entry::kind)
    }

    /// Shared reference to a binding entry. The entry stays registered.
    pub fn binding(&self, handle: Handle) -> Option<Arc<Adapter>> {
        match self.slots.lock().entries.get(&handle.0) {
            Some(Entry::Binding(adapter)) => Some(Arc::clone(adapter)),
            _ => None,
        }
    }

    /// Remove and return a dispatch entry.
    ///
    /// A binding stored under `handle` is left in place and `None` is
    /// returned: a dispatch delivery must never consume a binding.
    pub fn take_dispatch(&self, handle: Handle) -> Option<DispatchFn> {
        let mut slots = self.slots.lock();
        match slots.entries.get(&handle.0) {
            Some(Entry::Dispatch(_)) => match slots.entries.remove(&handle.0) {
                Some(Entry::Dispatch(f)) => Some(f),
                _ => None,
            },
            _ => None,
        }
    }

    /// Remove and return a binding entry, leaving dispatch entries alone
    pub fn remove_binding(&self, handle: Handle) -> Option<Arc<Adapter>> {
        let mut slots = self.slots.lock();
        match slots.entries.get(&handle.0) {
            Some(Entry::Binding(_)) => match slots.entries.remove(&handle.0) {
                Some(Entry::Binding(adapter)) => Some(adapter),
                _ => None,
            },
            _ => None,
        }
    }

    /// Remove an entry of either kind
    pub fn remove(&self, handle: Handle) -> Option<Entry> {
        let removed = self.slots.lock().entries.remove(&handle.0);
        if removed.is_some() {
            tracing::trace!(handle = %handle, "released");
        }
        removed
    }

    /// Check if a handle is live
    pub fn contains(&self, handle: Handle) -> bool {
        self.slots.lock().entries.contains_key(&handle.0)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.slots.lock().entries.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.slots.lock().entries.is_empty()
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}
