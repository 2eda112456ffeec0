//! Change detection for polling clients.
//!
//! Clients poll [`ChangeClock::last_modified`] cheaply and re-fetch the full
//! document when the answer changes. The primary signal is the document
//! file's modification time, so any write advances it, including a rewrite
//! with identical content. Two writes landing in the same filesystem
//! timestamp tick are indistinguishable by mtime alone; the revision counter
//! tells them apart within one server run.

use crate::error::{StoreError, StoreResult};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A snapshot of the document's version signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Version {
    /// Modification time of the document file, in fractional UNIX seconds.
    pub last_modified: f64,
    /// Writes committed since the store was opened.
    pub revision: u64,
}

/// Read-only view of the document's version.
///
/// Cloning is cheap; clones share the revision counter with the store that
/// created them. Reads take no lock.
#[derive(Debug, Clone)]
pub struct ChangeClock {
    path: PathBuf,
    revision: Arc<AtomicU64>,
}

impl ChangeClock {
    pub(crate) fn new(path: PathBuf, revision: Arc<AtomicU64>) -> Self {
        Self { path, revision }
    }

    /// Returns the path whose modification time is reported.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current revision counter.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Returns the document file's modification time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DocumentMissing`] if the file does not exist.
    pub fn modified_at(&self) -> StoreResult<SystemTime> {
        match std::fs::metadata(&self.path) {
            Ok(metadata) => Ok(metadata.modified()?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(StoreError::DocumentMissing),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns the current version of the document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DocumentMissing`] if the file does not exist, or
    /// an I/O error if its metadata cannot be read.
    pub fn last_modified(&self) -> StoreResult<Version> {
        let revision = self.revision();
        let modified = self.modified_at()?;
        Ok(Version {
            last_modified: unix_seconds(modified),
            revision,
        })
    }
}

/// Converts a timestamp to fractional seconds since the UNIX epoch.
///
/// Times before the epoch come out negative.
pub fn unix_seconds(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => since.as_secs_f64(),
        Err(before) => -before.duration().as_secs_f64(),
    }
}
