use bridge_traits::error::BridgeError;
use bridge_traits::StoreErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Book title cannot be empty")]
    NoBookTitle,

    #[error("No network connection")]
    NoNetwork,

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Store failure ({code}): {message}")]
    StoreFailure {
        code: StoreErrorCode,
        message: String,
    },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("A page request is already in flight for {query}")]
    PageRequestInFlight { query: String },

    #[error("{entity_type} already exists: {name}")]
    AlreadyExists { entity_type: String, name: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Caller-facing failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any network call; fix the input and retry.
    Validation,
    /// Pre-flight connectivity check failed; retry once online.
    NetworkUnavailable,
    /// A point read found nothing.
    NotFound,
    /// The store rejected or failed the request. Terminal for the call.
    StoreFailure,
}

impl LibraryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LibraryError::NoBookTitle
            | LibraryError::InvalidInput { .. }
            | LibraryError::InvalidQuery(_)
            | LibraryError::PageRequestInFlight { .. }
            | LibraryError::AlreadyExists { .. } => ErrorKind::Validation,
            LibraryError::NoNetwork => ErrorKind::NetworkUnavailable,
            LibraryError::NotFound { .. } => ErrorKind::NotFound,
            LibraryError::StoreFailure { .. } | LibraryError::Serialization(_) => {
                ErrorKind::StoreFailure
            }
        }
    }

    /// Underlying store code, when the failure came from the store.
    pub fn store_code(&self) -> Option<StoreErrorCode> {
        match self {
            LibraryError::StoreFailure { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn not_found(entity_type: &str, id: impl Into<String>) -> Self {
        LibraryError::NotFound {
            entity_type: entity_type.to_string(),
            id: id.into(),
        }
    }

    pub(crate) fn invalid_input(field: &str, message: impl Into<String>) -> Self {
        LibraryError::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<BridgeError> for LibraryError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Store { code, message } => LibraryError::StoreFailure { code, message },
            BridgeError::Serialization(e) => LibraryError::Serialization(e.to_string()),
            other => LibraryError::StoreFailure {
                code: other.store_code(),
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
