//! Loading a native engine from a shared library
//!
//! The library is opened with `dlopen` (`LoadLibraryW` on Windows) and must
//! export [`ENGINE_API_SYMBOL`](crate::api::ENGINE_API_SYMBOL).

#[cfg(unix)]
use std::ffi::CStr;
use std::ffi::{c_void, CString};
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::api::{EngineApi, EngineApiFn, ENGINE_API_SYMBOL};
use crate::engine::ExternEngine;
use crate::error::FfiResult;

/// Errors that can occur while loading an engine library
#[derive(Debug, Error)]
pub enum LoadError {
    /// The library could not be opened
    #[error("cannot open engine library {path}: {reason}")]
    NotFound {
        /// Path that was attempted
        path: String,
        /// Loader message
        reason: String,
    },

    /// A required symbol is missing
    #[error("symbol {symbol} not found in {library}")]
    SymbolNotFound {
        /// Symbol that was looked up
        symbol: String,
        /// Library path, with the loader message if any
        library: String,
    },

    /// The exported table accessor returned null
    #[error("{0} returned null")]
    NullApi(String),

    /// Path or symbol contains an interior NUL
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Path is not valid UTF-8
    #[error("invalid UTF-8 in path: {0}")]
    InvalidPath(String),
}

/// An opened native engine library
pub struct EngineLibrary {
    handle: LibraryHandle,
    path: String,
}

impl EngineLibrary {
    /// Open the shared library at `path`.
    ///
    /// Symbols are resolved eagerly and kept local to the library.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| LoadError::InvalidPath(format!("{:?}", path)))?;

        let handle = LibraryHandle::load(path_str)?;
        tracing::debug!(path = path_str, "engine library loaded");

        Ok(Self {
            handle,
            path: path_str.to_string(),
        })
    }

    /// Resolve `symbol` as a value of type `T`.
    ///
    /// # Safety
    ///
    /// `T` must be a pointer-sized type matching what the library exports
    /// under `symbol`, and must not be used after the library is dropped.
    pub unsafe fn get<T: Copy>(&self, symbol: &str) -> Result<T, LoadError> {
        let raw = self.handle.symbol(symbol, &self.path)?;
        Ok(std::mem::transmute_copy(&raw))
    }

    /// The engine function table exported by the library.
    ///
    /// The pointer stays valid while the library is loaded.
    pub fn engine_api(&self) -> Result<*const EngineApi, LoadError> {
        // SAFETY: the exported accessor has the `EngineApiFn` signature by
        // contract with engine libraries.
        let api = unsafe {
            let accessor: EngineApiFn = self.get(ENGINE_API_SYMBOL)?;
            accessor()
        };
        if api.is_null() {
            return Err(LoadError::NullApi(ENGINE_API_SYMBOL.to_string()));
        }
        Ok(api)
    }

    /// Create a window backed by this library. The engine keeps the library
    /// loaded until it is dropped.
    pub fn create_engine(self: &Arc<Self>, debug: bool) -> FfiResult<ExternEngine> {
        let api = self.engine_api()?;
        // SAFETY: `api` comes from this library, which the engine keeps alive.
        let engine = unsafe { ExternEngine::create(api, debug, std::ptr::null_mut())? };
        Ok(engine.keep_alive(Arc::clone(self)))
    }

    /// Path the library was loaded from
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(unix)]
type LibraryHandle = UnixLibrary;

#[cfg(windows)]
type LibraryHandle = WindowsLibrary;

fn c_name(name: &str) -> Result<CString, LoadError> {
    CString::new(name).map_err(|_| LoadError::InvalidName(name.escape_debug().to_string()))
}

#[cfg(unix)]
struct UnixLibrary {
    handle: *mut c_void,
}

#[cfg(unix)]
impl UnixLibrary {
    fn load(path: &str) -> Result<Self, LoadError> {
        let c_path = c_name(path)?;
        // SAFETY: `c_path` is a valid NUL-terminated string.
        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        if handle.is_null() {
            return Err(LoadError::NotFound {
                path: path.to_string(),
                reason: last_dl_error().unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(Self { handle })
    }

    unsafe fn symbol(&self, name: &str, library: &str) -> Result<*mut c_void, LoadError> {
        let c_symbol = c_name(name)?;

        // Clear stale state so a null symbol can be told apart from an error
        libc::dlerror();
        let symbol = libc::dlsym(self.handle, c_symbol.as_ptr());

        if let Some(reason) = last_dl_error() {
            return Err(LoadError::SymbolNotFound {
                symbol: name.to_string(),
                library: format!("{library}: {reason}"),
            });
        }
        if symbol.is_null() {
            return Err(LoadError::SymbolNotFound {
                symbol: name.to_string(),
                library: library.to_string(),
            });
        }
        Ok(symbol)
    }
}

#[cfg(unix)]
fn last_dl_error() -> Option<String> {
    // SAFETY: dlerror returns null or a valid C string owned by libc.
    unsafe {
        let err = libc::dlerror();
        if err.is_null() {
            None
        } else {
            Some(CStr::from_ptr(err).to_string_lossy().into_owned())
        }
    }
}

#[cfg(unix)]
impl Drop for UnixLibrary {
    fn drop(&mut self) {
        // SAFETY: `handle` came from a successful dlopen.
        unsafe {
            libc::dlclose(self.handle);
        }
    }
}

// SAFETY: a dlopen handle is a process-wide token and dlsym is thread-safe.
#[cfg(unix)]
unsafe impl Send for UnixLibrary {}
#[cfg(unix)]
unsafe impl Sync for UnixLibrary {}

#[cfg(windows)]
struct WindowsLibrary {
    handle: *mut c_void,
}

#[cfg(windows)]
impl WindowsLibrary {
    fn load(path: &str) -> Result<Self, LoadError> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;

        let wide: Vec<u16> = OsStr::new(path)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        // SAFETY: `wide` is NUL-terminated.
        let handle = unsafe { LoadLibraryW(wide.as_ptr()) };
        if handle.is_null() {
            // SAFETY: no preconditions
            let code = unsafe { GetLastError() };
            return Err(LoadError::NotFound {
                path: path.to_string(),
                reason: format!("error code {code}"),
            });
        }
        Ok(Self { handle })
    }

    unsafe fn symbol(&self, name: &str, library: &str) -> Result<*mut c_void, LoadError> {
        let c_symbol = c_name(name)?;
        let symbol = GetProcAddress(self.handle, c_symbol.as_ptr());
        if symbol.is_null() {
            return Err(LoadError::SymbolNotFound {
                symbol: name.to_string(),
                library: format!("{library} (error code {})", GetLastError()),
            });
        }
        Ok(symbol)
    }
}

#[cfg(windows)]
impl Drop for WindowsLibrary {
    fn drop(&mut self) {
        // SAFETY: `handle` came from a successful LoadLibraryW.
        unsafe {
            FreeLibrary(self.handle);
        }
    }
}

// SAFETY: module handles are process-wide and GetProcAddress is thread-safe.
#[cfg(windows)]
unsafe impl Send for WindowsLibrary {}
#[cfg(windows)]
unsafe impl Sync for WindowsLibrary {}

#[cfg(windows)]
extern "system" {
    fn LoadLibraryW(filename: *const u16) -> *mut c_void;
    fn GetProcAddress(module: *mut c_void, procname: *const std::os::raw::c_char) -> *mut c_void;
    fn FreeLibrary(module: *mut c_void) -> i32;
    fn GetLastError() -> u32;
}
