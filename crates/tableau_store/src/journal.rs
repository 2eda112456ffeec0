//! Activity journal.
//!
//! Every successful save or delete leaves an entry in `data/logs.json`, a JSON
//! array of the newest [`MAX_ENTRIES`] entries. The journal is secondary data:
//! a failure to record never fails the operation that triggered it.

use crate::document::{Category, Item};
use crate::error::{StoreError, StoreResult};
use crate::layout::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Maximum number of entries kept in the journal.
pub const MAX_ENTRIES: usize = 1000;

/// Longest message excerpt stored in a label, in characters.
const EXCERPT_CHARS: usize = 50;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalAction {
    /// A message was posted to a message board.
    MessageCreated,
    /// An item was added to another category.
    ItemAdded,
    /// A message was removed from a message board.
    MessageDeleted,
    /// An item was removed from another category.
    ItemDeleted,
}

impl JournalAction {
    /// Returns the action for adding an item to `category`.
    #[must_use]
    pub const fn added(category: Category) -> Self {
        if category.is_message_board() {
            Self::MessageCreated
        } else {
            Self::ItemAdded
        }
    }

    /// Returns the action for removing an item from `category`.
    #[must_use]
    pub const fn deleted(category: Category) -> Self {
        if category.is_message_board() {
            Self::MessageDeleted
        } else {
            Self::ItemDeleted
        }
    }
}

/// One journal record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// When the operation committed.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub action: JournalAction,
    /// Where it happened.
    pub category: Category,
    /// Short human-readable description of the item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl JournalEntry {
    /// Builds an entry describing `item`, stamped with the current time.
    pub fn new(action: JournalAction, category: Category, item: &Item) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            category,
            label: describe(category, item),
        }
    }
}

fn describe(category: Category, item: &Item) -> Option<String> {
    if category.is_message_board() {
        let excerpt = item
            .get_str("text")
            .map(|text| text.chars().take(EXCERPT_CHARS).collect::<String>());
        return match (item.get_str("author"), excerpt) {
            (Some(author), Some(text)) => Some(format!("{author}: {text}")),
            (Some(author), None) => Some(author.to_string()),
            (None, text) => text,
        };
    }

    item.get_str("name")
        .or_else(|| item.get_str("title"))
        .map(str::to_string)
}

/// Append-only log of store activity.
///
/// Not synchronized on its own; the document store records entries while
/// holding its write lock.
#[derive(Debug, Clone)]
pub struct ActivityJournal {
    path: PathBuf,
}

impl ActivityJournal {
    /// Creates a journal backed by `path`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the journal file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all entries, oldest first. A missing file reads as empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupted`] if the file is not a valid journal.
    pub fn entries(&self) -> StoreResult<Vec<JournalEntry>> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        serde_json::from_slice(&data).map_err(|err| StoreError::Corrupted {
            path: self.path.display().to_string(),
            message: err.to_string(),
        })
    }

    /// Appends an entry, trimming the oldest ones beyond [`MAX_ENTRIES`].
    ///
    /// An unreadable journal is replaced by a fresh one rather than blocking
    /// new entries.
    pub fn append(&self, entry: JournalEntry) -> StoreResult<()> {
        let mut entries = self.entries().unwrap_or_else(|err| {
            warn!(error = %err, "starting a fresh activity journal");
            Vec::new()
        });

        entries.push(entry);
        if entries.len() > MAX_ENTRIES {
            let excess = entries.len() - MAX_ENTRIES;
            entries.drain(..excess);
        }

        let data = serde_json::to_vec_pretty(&entries)?;
        write_atomic(&self.path, &data)?;
        Ok(())
    }

    /// Records an entry, logging instead of failing.
    pub fn record(&self, entry: JournalEntry) {
        let action = entry.action;
        if let Err(err) = self.append(entry) {
            warn!(?action, error = %err, "failed to record activity");
        }
    }
}
