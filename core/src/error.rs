//! Error types for tfc-rs.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tfc-rs operations.
pub type Result<T> = std::result::Result<T, TfError>;

/// Errors raised while locating, binding, or driving the TensorFlow C API.
#[derive(Debug, Error)]
pub enum TfError {
    /// The installation root is not configured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No shared library matched the platform naming rules.
    #[error("Could not find {name} ({marker}*) under {}", dir.display())]
    LibraryNotFound {
        name: String,
        marker: String,
        dir: PathBuf,
    },

    /// The library directory could not be listed.
    #[error("Failed to scan {} for TensorFlow libraries: {source}", dir.display())]
    Scan {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dynamic loader rejected a library.
    #[error("Failed to open {}: {source}", path.display())]
    LibraryOpen {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    /// A required entry point is absent, usually a library version mismatch.
    #[error("Missing TensorFlow symbol: {0}")]
    MissingSymbol(String),

    /// A native call left a non-OK status behind.
    #[error("{action} failed (TF code={code}): {message}")]
    NativeCall {
        action: String,
        code: i32,
        message: String,
    },

    /// A native call returned NULL where a handle was expected.
    #[error("{0} returned NULL")]
    NullResult(String),

    /// A session method was called out of order.
    #[error("{action} is not allowed while the session is {state}")]
    InvalidState { action: String, state: String },

    /// An operation was used with a graph other than the one that built it.
    #[error("{action}: operation belongs to a different graph")]
    ForeignOperation { action: String },

    /// A tensor was read as a type other than the one it holds.
    #[error("Tensor holds TF dtype {actual}, read as dtype {expected}")]
    DtypeMismatch { expected: i32, actual: i32 },

    /// The process already holds a loaded binding table.
    #[error("TensorFlow library is already loaded; close the existing binding table first")]
    AlreadyLoaded,

    /// A string could not be marshaled into a C string.
    #[error("Cannot pass string to native code: {0}")]
    Marshal(String),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TfError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a missing-symbol error.
    pub fn missing_symbol(name: impl Into<String>) -> Self {
        Self::MissingSymbol(name.into())
    }

    /// Create a native-call error.
    pub fn native_call(action: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Self::NativeCall {
            action: action.into(),
            code,
            message: message.into(),
        }
    }

    /// Create a null-result error.
    pub fn null_result(call: impl Into<String>) -> Self {
        Self::NullResult(call.into())
    }

    /// Create a marshaling error.
    pub fn marshal(msg: impl Into<String>) -> Self {
        Self::Marshal(msg.into())
    }

    /// Native status code carried by a [`TfError::NativeCall`].
    pub fn native_code(&self) -> Option<i32> {
        match self {
            Self::NativeCall { code, .. } => Some(*code),
            _ => None,
        }
    }
}
