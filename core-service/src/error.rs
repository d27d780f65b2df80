use core_library::{ErrorKind, LibraryError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Session for user {0} is closed")]
    SessionClosed(String),
}

impl CoreError {
    /// Failure class of a library error; `None` for setup failures.
    pub fn library_kind(&self) -> Option<ErrorKind> {
        match self {
            CoreError::Library(err) => Some(err.kind()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
