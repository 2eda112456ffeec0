//! # Tableau Store
//!
//! Persistence for the Tableau bulletin board.
//!
//! The whole board lives in one JSON document, `data/db.json`, holding four
//! fixed categories of opaque items. This crate provides:
//!
//! - [`DocumentStore`] - serialized, atomic append/delete on the document
//! - [`ChangeClock`] - cheap version signal for polling clients
//! - [`AssetStore`] - sanitized image uploads and best-effort cleanup
//! - [`ActivityJournal`] - audit trail of saves and deletes
//!
//! ## Concurrency
//!
//! Every mutation holds the store's write lock for its full read → modify →
//! write cycle, so no update is lost. Files are replaced with a temp file and
//! rename, so lock-free readers never observe a torn document.
//!
//! ## Example
//!
//! ```rust
//! use tableau_store::{Category, DocumentStore, Item, SiteLayout};
//! use serde_json::json;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = DocumentStore::open(SiteLayout::new(dir.path())).unwrap();
//!
//! let event = Item::from_value(json!({"title": "Portes ouvertes"})).unwrap();
//! store.append("events", event).unwrap();
//!
//! let doc = store.load().unwrap();
//! assert_eq!(doc.items(Category::Events).len(), 1);
//! assert!(store.clock().last_modified().is_ok());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod assets;
mod clock;
mod document;
mod error;
mod journal;
mod layout;
mod store;

pub use assets::{sanitize_filename, AssetCleaner, AssetStore};
pub use clock::{unix_seconds, ChangeClock, Version};
pub use document::{Category, Document, Item};
pub use error::{StoreError, StoreResult};
pub use journal::{ActivityJournal, JournalAction, JournalEntry, MAX_ENTRIES};
pub use layout::{SiteLayout, UPLOAD_PREFIX};
pub use store::DocumentStore;
