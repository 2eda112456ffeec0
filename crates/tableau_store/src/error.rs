//! Error types for store operations.

use crate::document::Category;
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or mutating the site's data.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The category name is not one of the recognized categories.
    #[error("invalid category: {0}")]
    InvalidCategory(String),

    /// No item in the category is structurally equal to the one requested.
    #[error("item not found in {category}")]
    ItemNotFound {
        /// The category that was searched.
        category: Category,
    },

    /// The document file has not been created yet.
    #[error("document file does not exist")]
    DocumentMissing,

    /// An upload was attempted without a usable file name.
    #[error("missing filename")]
    MissingFilename,

    /// Another store already owns the data directory.
    #[error("data directory locked: another store has exclusive access")]
    Locked,

    /// A persisted file could not be parsed.
    #[error("corrupted file {path}: {message}")]
    Corrupted {
        /// The offending file.
        path: String,
        /// Parser diagnostic.
        message: String,
    },

    /// Serialization failed.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Returns true if the error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidCategory(_) | StoreError::MissingFilename
        )
    }

    /// Returns true if the error means the requested data does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::ItemNotFound { .. } | StoreError::DocumentMissing
        )
    }
}
