//! Errors raised while attaching to a native engine

use thiserror::Error;

use crate::loader::LoadError;

/// Errors from the C engine glue
#[derive(Debug, Error)]
pub enum FfiError {
    /// The library could not be loaded or does not export the engine table
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The engine table pointer was null
    #[error("engine API table is null")]
    NullApi,

    /// `create` returned a null window
    #[error("engine failed to create a window")]
    CreateFailed,
}

/// Result alias for the C glue
pub type FfiResult<T> = Result<T, FfiError>;
