//! Error types for the server.

use hyper::StatusCode;
use tableau_store::StoreError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while handling a request or running the server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Malformed body, missing fields or headers.
    #[error("{0}")]
    InvalidRequest(String),

    /// The category is not one of the recognized categories.
    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    /// The requested resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The path exists but not for this method.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// The declared body is larger than allowed.
    #[error("payload too large: {declared} bytes exceeds limit of {limit}")]
    PayloadTooLarge {
        /// Declared `Content-Length`.
        declared: u64,
        /// Configured limit.
        limit: u64,
    },

    /// Store failure that is not the caller's fault.
    #[error("store error: {0}")]
    Store(StoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) | ServerError::InvalidCategory(_) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ServerError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Store(_) | ServerError::Internal(_) | ServerError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidCategory(name) => ServerError::InvalidCategory(name),
            StoreError::MissingFilename => ServerError::InvalidRequest("Missing filename".into()),
            StoreError::DocumentMissing => ServerError::NotFound("Database file not found".into()),
            StoreError::ItemNotFound { .. } => ServerError::NotFound("Item not found".into()),
            other => ServerError::Store(other),
        }
    }
}
