//! Uploaded files under `assets/images/`.
//!
//! Uploads keep only the base name of the client's file name, so a request
//! can never write outside the upload directory. Files with the same name are
//! replaced atomically (last write wins), so a concurrent static read sees
//! either the old or the new file.
//!
//! Cleanup is best effort and deliberately strict about what it will remove:
//! the path must be relative, start with [`UPLOAD_PREFIX`], contain no `..`
//! component, and resolve (after following symlinks) to a regular file that
//! lives inside the upload directory. Anything else is ignored.

use crate::error::{StoreError, StoreResult};
use crate::layout::{write_atomic, SiteLayout, UPLOAD_PREFIX};
use parking_lot::Mutex;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Removes files referenced by deleted items.
///
/// Implementations must never fail the caller: problems are logged and
/// reported through the return value only.
pub trait AssetCleaner: Send + Sync {
    /// Deletes the file at `path` (relative to the site root) if it is a
    /// removable upload. Returns true if a file was removed.
    fn cleanup(&self, path: &str) -> bool;
}

/// Writes and removes uploaded files.
#[derive(Debug, Clone)]
pub struct AssetStore {
    layout: SiteLayout,
    // shared by clones; write_atomic needs one writer per temp file
    upload_lock: Arc<Mutex<()>>,
}

impl AssetStore {
    /// Creates an asset store for the given site.
    pub fn new(layout: SiteLayout) -> Self {
        Self {
            layout,
            upload_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the directory uploads are written to.
    #[must_use]
    pub fn upload_dir(&self) -> PathBuf {
        self.layout.upload_dir()
    }

    /// Stores `bytes` under the base name of `filename`.
    ///
    /// Returns the stored file's path relative to the site root, always with
    /// forward slashes (for example `assets/images/photo.jpg`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingFilename`] if no usable base name remains
    /// after stripping directories, or an I/O error if writing fails.
    pub fn upload(&self, filename: Option<&str>, bytes: &[u8]) -> StoreResult<String> {
        let name = filename
            .and_then(sanitize_filename)
            .ok_or(StoreError::MissingFilename)?;

        let dir = self.upload_dir();
        let _guard = self.upload_lock.lock();
        fs::create_dir_all(&dir)?;
        write_atomic(&dir.join(name), bytes)?;

        info!(file = name, bytes = bytes.len(), "stored upload");
        Ok(format!("{UPLOAD_PREFIX}/{name}"))
    }

    /// Resolves `path` to a removable file inside the upload directory.
    fn resolve_removable(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim());
        if !is_under_upload_prefix(relative) {
            return None;
        }

        let target = fs::canonicalize(self.layout.root().join(relative)).ok()?;
        let upload_dir = fs::canonicalize(self.upload_dir()).ok()?;
        if !target.starts_with(&upload_dir) || target == upload_dir {
            return None;
        }

        let metadata = fs::metadata(&target).ok()?;
        metadata.is_file().then_some(target)
    }
}

impl AssetCleaner for AssetStore {
    fn cleanup(&self, path: &str) -> bool {
        let Some(target) = self.resolve_removable(path) else {
            debug!(path, "skipping asset cleanup: not a removable upload");
            return false;
        };

        match fs::remove_file(&target) {
            Ok(()) => {
                info!(path, "removed asset");
                true
            }
            Err(err) => {
                warn!(path, error = %err, "failed to remove asset");
                false
            }
        }
    }
}

/// Returns the base name of a client-supplied file name.
///
/// Both `/` and `\` count as separators, whatever the host platform, so
/// `..\..\evil.png` and `../../etc/passwd` both reduce to their last part.
/// Returns `None` if nothing usable is left.
pub fn sanitize_filename(filename: &str) -> Option<&str> {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    match base {
        "" | "." | ".." => None,
        name if name.contains('\0') => None,
        name => Some(name),
    }
}

fn is_under_upload_prefix(path: &Path) -> bool {
    let mut components = path.components();
    for expected in UPLOAD_PREFIX.split('/') {
        match components.next() {
            Some(Component::Normal(part)) if part == expected => {}
            _ => return false,
        }
    }

    let mut rest = components.peekable();
    rest.peek().is_some() && rest.all(|c| matches!(c, Component::Normal(_)))
}
