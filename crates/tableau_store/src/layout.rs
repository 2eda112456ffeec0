//! Site directory layout.
//!
//! Every path the store touches is fixed relative to the site root:
//!
//! ```text
//! <root>/
//! ├─ data/
//! │  ├─ db.json        # The document
//! │  ├─ logs.json      # Activity journal
//! │  └─ LOCK           # Advisory lock for single-writer
//! └─ assets/
//!    └─ images/        # Uploaded files
//! ```
//!
//! The LOCK file ensures only one store writes the document at a time, across
//! processes as well as within one.

use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const DATA_DIR: &str = "data";
const DOCUMENT_FILE: &str = "db.json";
const JOURNAL_FILE: &str = "logs.json";
const LOCK_FILE: &str = "LOCK";

/// Upload directory relative to the site root, with forward slashes.
///
/// This is also the prefix of every path returned by an upload.
pub const UPLOAD_PREFIX: &str = "assets/images";

/// Resolves the fixed file layout against a site root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLayout {
    root: PathBuf,
}

impl SiteLayout {
    /// Creates a layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the site root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the data directory.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    /// Returns the path to the document file.
    #[must_use]
    pub fn document_path(&self) -> PathBuf {
        self.data_dir().join(DOCUMENT_FILE)
    }

    /// Returns the path to the activity journal.
    #[must_use]
    pub fn journal_path(&self) -> PathBuf {
        self.data_dir().join(JOURNAL_FILE)
    }

    /// Returns the path to the LOCK file.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.data_dir().join(LOCK_FILE)
    }

    /// Returns the upload directory.
    #[must_use]
    pub fn upload_dir(&self) -> PathBuf {
        UPLOAD_PREFIX
            .split('/')
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

/// Exclusive ownership of a site's data directory.
///
/// Holding a `DataDirLock` means no other store, in this process or another,
/// can write the document. The lock is released when the value is dropped.
#[derive(Debug)]
pub(crate) struct DataDirLock {
    _lock_file: File,
}

impl DataDirLock {
    /// Creates the data directory if needed and takes the lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Locked`] if another store holds the lock.
    pub(crate) fn acquire(layout: &SiteLayout) -> StoreResult<Self> {
        fs::create_dir_all(layout.data_dir())?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(layout.lock_path())?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked);
        }

        Ok(Self {
            _lock_file: lock_file,
        })
    }
}

/// Replaces `path` with `data` atomically.
///
/// Uses the write-then-rename pattern:
/// 1. Write to a temporary file next to the target
/// 2. Sync the temporary file to disk
/// 3. Rename it over the target
/// 4. Fsync the parent directory so the rename is durable
///
/// Readers of `path` observe either the old or the new content, never a mix.
/// Callers must serialize writers of the same path.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let mut temp_name = file_name.to_os_string();
    temp_name.push(".tmp");
    let temp_path = parent.join(temp_name);

    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path)?;
    sync_directory(parent)
}

#[cfg(unix)]
fn sync_directory(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> io::Result<()> {
    // NTFS journals metadata; directory handles cannot be fsynced.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn paths_are_correct() {
        let layout = SiteLayout::new("/srv/site");

        assert_eq!(layout.document_path(), Path::new("/srv/site/data/db.json"));
        assert_eq!(layout.journal_path(), Path::new("/srv/site/data/logs.json"));
        assert_eq!(layout.lock_path(), Path::new("/srv/site/data/LOCK"));
        assert_eq!(layout.upload_dir(), Path::new("/srv/site/assets/images"));
    }

    #[test]
    fn acquire_creates_data_dir() {
        let temp = tempdir().unwrap();
        let layout = SiteLayout::new(temp.path().join("site"));

        let _lock = DataDirLock::acquire(&layout).unwrap();
        assert!(layout.data_dir().is_dir());
        assert!(layout.lock_path().exists());
        assert!(!layout.document_path().exists());
    }

    #[test]
    fn lock_prevents_second_acquire() {
        let temp = tempdir().unwrap();
        let layout = SiteLayout::new(temp.path());

        let _first = DataDirLock::acquire(&layout).unwrap();
        let second = DataDirLock::acquire(&layout);
        assert!(matches!(second, Err(StoreError::Locked)));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        let layout = SiteLayout::new(temp.path());

        {
            let _lock = DataDirLock::acquire(&layout).unwrap();
        }

        let _again = DataDirLock::acquire(&layout).unwrap();
    }

    #[test]
    fn write_atomic_replaces_content() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("db.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert!(!temp.path().join("db.json.tmp").exists());
    }
}
