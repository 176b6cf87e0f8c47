//! Knowledge entry types
//!
//! An entry is a short text passage plus free-form string metadata. Entries
//! are immutable once added to a collection.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Conventional metadata key naming where a passage came from
pub const SOURCE_KEY: &str = "source";
/// Conventional metadata key with a short description of the passage
pub const DESC_KEY: &str = "desc";

/// Free-form entry metadata, ordered so serialized output is stable
pub type Metadata = BTreeMap<String, String>;

/// Identifier assigned to an entry when it enters an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    /// Create a new random EntryId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A text passage with its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Entry {
    /// Create an entry with empty metadata
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    /// Create an entry with the given metadata
    pub fn with_metadata(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    /// Set a metadata key
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the `source` metadata key
    pub fn source(self, source: impl Into<String>) -> Self {
        self.meta(SOURCE_KEY, source)
    }

    /// Set the `desc` metadata key
    pub fn desc(self, desc: impl Into<String>) -> Self {
        self.meta(DESC_KEY, desc)
    }

    /// The `source` metadata value, if present
    pub fn source_value(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }

    /// The `desc` metadata value, if present
    pub fn desc_value(&self) -> Option<&str> {
        self.metadata.get(DESC_KEY).map(String::as_str)
    }
}

/// Side-table record persisted next to an entry's vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub id: EntryId,
    pub added_at: DateTime<Utc>,
    #[serde(flatten)]
    pub entry: Entry,
}

impl StoredEntry {
    /// Wrap an entry with a fresh id and the current time
    pub fn new(entry: Entry) -> Self {
        Self {
            id: EntryId::new(),
            added_at: Utc::now(),
            entry,
        }
    }
}

/// A search result: an entry and its distance to the query
///
/// Lower distance means more similar.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub entry: Entry,
    pub distance: f32,
}

impl SearchHit {
    pub fn new(entry: Entry, distance: f32) -> Self {
        Self { entry, distance }
    }

    /// Displayed similarity, `1 - distance`. Not clamped.
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}
