//! Error types for the callback bridge

use crate::handle::Handle;

/// Result type for bridge operations
pub type BindResult<T> = Result<T, BridgeError>;

/// Bridge error types
///
/// Errors raised while a script call is being served (`Request` through
/// `Encoding`) never escape to the engine: they are folded into an error
/// completion whose payload is the JSON-encoded message.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The bound function has a shape the bridge cannot serve
    #[error("{0}")]
    Configuration(String),

    /// Request payload is not a JSON array
    #[error("{0}")]
    Request(#[source] serde_json::Error),

    /// Argument count does not match the function's parameters
    #[error("function arguments mismatch: expected {expected}{}, got {got}", or_more(.variadic))]
    Arity {
        /// Number of arguments the function requires
        expected: usize,
        /// Whether trailing arguments are absorbed by a variadic parameter
        variadic: bool,
        /// Number of arguments in the request
        got: usize,
    },

    /// An argument failed to decode into its parameter type
    #[error("argument {index}: {source}")]
    Argument {
        /// Zero-based position in the request array
        index: usize,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// The bound function returned an error
    #[error("{0}")]
    Application(String),

    /// The bound function panicked
    #[error("function panicked: {0}")]
    Panicked(String),

    /// The return value could not be serialized
    #[error("{0}")]
    Encoding(#[source] serde_json::Error),

    /// Native code delivered a handle that is not in the table
    #[error("handle {0} is not registered")]
    UnknownHandle(Handle),

    /// A binding with this name already exists on the window
    #[error("binding '{0}' is already registered")]
    DuplicateBinding(String),

    /// No binding with this name exists on the window
    #[error("binding '{0}' is not registered")]
    UnknownBinding(String),
}

fn or_more(variadic: &bool) -> &'static str {
    if *variadic {
        " or more"
    } else {
        ""
    }
}

impl BridgeError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        BridgeError::Configuration(msg.into())
    }

    /// True for errors that report a broken contract with the engine
    /// rather than a failed call.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, BridgeError::UnknownHandle(_))
    }
}
