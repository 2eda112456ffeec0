//! The document store.

use crate::assets::{AssetCleaner, AssetStore};
use crate::clock::ChangeClock;
use crate::document::{Category, Document, Item};
use crate::error::{StoreError, StoreResult};
use crate::journal::{ActivityJournal, JournalAction, JournalEntry};
use crate::layout::{write_atomic, DataDirLock, SiteLayout};
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Owner of the site's document file.
///
/// All reads and writes of `data/db.json` go through this type. Mutations
/// (`append`, `delete`) run their whole read → mutate → write cycle under a
/// single write lock, so concurrent requests never lose each other's
/// updates. The data directory's LOCK file guarantees that this lock is the
/// only one guarding the file.
///
/// Writes replace the file atomically (temp file + rename), so lock-free
/// readers such as [`DocumentStore::load`], the [`ChangeClock`] or a static
/// file server never see a partially written document.
///
/// # Example
///
/// ```no_run
/// use tableau_store::{DocumentStore, Item, SiteLayout};
/// use serde_json::json;
///
/// let store = DocumentStore::open(SiteLayout::new("site")).unwrap();
/// let item = Item::from_value(json!({"title": "Assemblée générale"})).unwrap();
/// store.append("events", item.clone()).unwrap();
/// store.delete("events", &item).unwrap();
/// ```
pub struct DocumentStore {
    layout: SiteLayout,
    write_lock: Mutex<()>,
    revision: Arc<AtomicU64>,
    cleaner: Arc<dyn AssetCleaner>,
    journal: ActivityJournal,
    _dir_lock: DataDirLock,
}

impl DocumentStore {
    /// Opens the store for a site, cleaning up deleted items' images with an
    /// [`AssetStore`] on the same site.
    ///
    /// The document file itself is not created until the first save.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Locked`] if another store owns the site's data
    /// directory, or an I/O error if the directory cannot be created.
    pub fn open(layout: SiteLayout) -> StoreResult<Self> {
        let cleaner = Arc::new(AssetStore::new(layout.clone()));
        Self::open_with_cleaner(layout, cleaner)
    }

    /// Opens the store with a custom asset cleaner.
    ///
    /// # Errors
    ///
    /// Same as [`DocumentStore::open`].
    pub fn open_with_cleaner(
        layout: SiteLayout,
        cleaner: Arc<dyn AssetCleaner>,
    ) -> StoreResult<Self> {
        let dir_lock = DataDirLock::acquire(&layout)?;
        let journal = ActivityJournal::new(layout.journal_path());

        debug!(root = %layout.root().display(), "opened document store");

        Ok(Self {
            layout,
            write_lock: Mutex::new(()),
            revision: Arc::new(AtomicU64::new(0)),
            cleaner,
            journal,
            _dir_lock: dir_lock,
        })
    }

    /// Returns the site layout.
    #[must_use]
    pub fn layout(&self) -> &SiteLayout {
        &self.layout
    }

    /// Returns a clock reporting this store's document version.
    #[must_use]
    pub fn clock(&self) -> ChangeClock {
        ChangeClock::new(self.layout.document_path(), Arc::clone(&self.revision))
    }

    /// Returns the number of writes committed since the store was opened.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Returns the activity journal.
    #[must_use]
    pub fn journal(&self) -> &ActivityJournal {
        &self.journal
    }

    /// Reads the persisted document without taking the write lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DocumentMissing`] if nothing was saved yet.
    pub fn load(&self) -> StoreResult<Document> {
        self.read_document()?.ok_or(StoreError::DocumentMissing)
    }

    /// Appends `item` to the end of `category` and persists the document.
    ///
    /// Creates the document, with every category empty, if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidCategory`] for unknown category names;
    /// nothing is written in that case.
    pub fn append(&self, category: &str, item: Item) -> StoreResult<()> {
        let category: Category = category.parse()?;

        let _guard = self.write_lock.lock();
        let mut document = self.read_document()?.unwrap_or_default();

        let entry = JournalEntry::new(JournalAction::added(category), category, &item);
        document.push(category, item);
        self.persist(&document)?;
        self.journal.record(entry);

        info!(%category, items = document.items(category).len(), "saved item");
        Ok(())
    }

    /// Removes the first item of `category` structurally equal to `item`.
    ///
    /// Later duplicates are kept. If the removed item has an `image` field,
    /// the referenced upload is cleaned up after the document is persisted;
    /// cleanup problems are logged and do not fail the delete.
    ///
    /// # Errors
    ///
    /// - [`StoreError::DocumentMissing`] if nothing was saved yet
    /// - [`StoreError::InvalidCategory`] for unknown category names
    /// - [`StoreError::ItemNotFound`] if no item matches; the file is not
    ///   touched in that case
    pub fn delete(&self, category: &str, item: &Item) -> StoreResult<()> {
        let guard = self.write_lock.lock();
        let mut document = self.read_document()?.ok_or(StoreError::DocumentMissing)?;
        let category: Category = category.parse()?;

        let removed = document
            .remove_first(category, item)
            .ok_or(StoreError::ItemNotFound { category })?;

        self.persist(&document)?;
        self.journal.record(JournalEntry::new(
            JournalAction::deleted(category),
            category,
            &removed,
        ));
        drop(guard);

        info!(%category, items = document.items(category).len(), "deleted item");

        if let Some(image) = removed.image() {
            self.cleaner.cleanup(image);
        }
        Ok(())
    }

    fn read_document(&self) -> StoreResult<Option<Document>> {
        let path = self.layout.document_path();
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Document::from_json(&data)
            .map(Some)
            .map_err(|err| StoreError::Corrupted {
                path: path.display().to_string(),
                message: err.to_string(),
            })
    }

    /// Must be called with the write lock held.
    fn persist(&self, document: &Document) -> StoreResult<()> {
        let data = document.to_pretty_json()?;
        write_atomic(&self.layout.document_path(), &data)?;
        self.revision.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
