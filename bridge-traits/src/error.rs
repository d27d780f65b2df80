use std::fmt;

use thiserror::Error;

/// Status codes surfaced by a remote document store.
///
/// Adapters translate their vendor-specific failures into this closed set so
/// that callers can log and classify failures without knowing the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorCode {
    Cancelled,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    Unavailable,
    Internal,
    Unknown,
}

impl StoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreErrorCode::Cancelled => "cancelled",
            StoreErrorCode::InvalidArgument => "invalid-argument",
            StoreErrorCode::DeadlineExceeded => "deadline-exceeded",
            StoreErrorCode::NotFound => "not-found",
            StoreErrorCode::AlreadyExists => "already-exists",
            StoreErrorCode::PermissionDenied => "permission-denied",
            StoreErrorCode::Unavailable => "unavailable",
            StoreErrorCode::Internal => "internal",
            StoreErrorCode::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Store error ({code}): {message}")]
    Store {
        code: StoreErrorCode,
        message: String,
    },

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Shorthand for building a [`BridgeError::Store`].
    pub fn store(code: StoreErrorCode, message: impl Into<String>) -> Self {
        BridgeError::Store {
            code,
            message: message.into(),
        }
    }

    /// Store code carried by this error. Errors that did not originate in the
    /// store map to [`StoreErrorCode::Unknown`] (or `Unavailable` for I/O).
    pub fn store_code(&self) -> StoreErrorCode {
        match self {
            BridgeError::Store { code, .. } => *code,
            BridgeError::Io(_) => StoreErrorCode::Unavailable,
            BridgeError::Serialization(_) => StoreErrorCode::InvalidArgument,
            BridgeError::NotAvailable(_) => StoreErrorCode::Unavailable,
            _ => StoreErrorCode::Unknown,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
