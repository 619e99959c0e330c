//! Callback bridge between host closures and an embedded web engine
//!
//! Native engine code cannot hold a Rust closure. It holds a [`Handle`], and
//! the [`Bridge`] resolves that handle back to the closure when the engine
//! calls in:
//!
//! - **Dispatch**: [`Webview::dispatch`] / [`Proxy::dispatch`] post a
//!   one-shot closure to run on the UI thread.
//! - **Binding**: [`Webview::bind`] exposes a typed Rust function to page
//!   script. Calls arrive as a JSON argument array and settle with a
//!   [`Completion`] carrying a status and one JSON value.
//!
//! # Example
//!
//! ```ignore
//! use webbind_core::{HeadlessEngine, Variadic, Webview};
//!
//! let webview = Webview::new(HeadlessEngine::new(false));
//! webview.bind("sum", |label: String, nums: Variadic<i64>| -> Result<i64, String> {
//!     Ok(nums.iter().sum())
//! })?;
//! webview.set_title("demo");
//! webview.run();
//! ```

pub mod binding;
pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod handle;
pub mod headless;
pub mod invoke;
pub mod webview;

#[cfg(test)]
mod testing;

pub use bridge::Bridge;
pub use config::{ConfigError, WindowConfig};
pub use engine::{Completion, Engine, SharedEngine, SizeHint, Status};
pub use error::{BindResult, BridgeError};
pub use handle::{DispatchFn, Entry, EntryKind, Handle, HandleTable};
pub use headless::HeadlessEngine;
pub use invoke::{
    Adapter, ErrorSlot, IntoBinding, IntoReturn, Json, Param, ReturnShape, Signature, Variadic,
};
pub use webview::{Proxy, Webview};
