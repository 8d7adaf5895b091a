//! Storage traits and error types
//!
//! This module defines the trait interface for document id backends and
//! associated error types.

use crate::storage::IdentityRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage has been closed")]
    Closed,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported schema version {found} (this build supports up to {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result of an atomic put-if-absent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The mapping was written
    Inserted,

    /// The URL already maps to this doc id; nothing was written
    Existing(String),

    /// The doc id already belongs to another URL; nothing was written
    IdTaken,
}

/// How writes reach the disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// Every write is committed and synced before it returns
    Synchronous,

    /// Writes may sit in OS buffers; a crash can lose recent assignments
    Deferred,
}

impl Durability {
    pub fn for_resumable(resumable_crawling: bool) -> Self {
        if resumable_crawling {
            Self::Synchronous
        } else {
            Self::Deferred
        }
    }
}

/// Trait for document id backend implementations
///
/// A backend is a durable map from canonical URL to doc id, with both sides
/// unique. `insert_if_absent` must be atomic in the backend itself, not only
/// under the caller's lock, so several processes can share one backend.
pub trait DocIdStorage: Send {
    /// Gets the doc id mapped to `url`, if any
    fn get_doc_id(&self, url: &str) -> StorageResult<Option<String>>;

    /// Writes `url -> doc_id` unless `url` is already mapped or `doc_id` is already used
    fn insert_if_absent(&mut self, url: &str, doc_id: &str) -> StorageResult<InsertOutcome>;

    /// Counts stored mappings
    fn count_doc_ids(&self) -> StorageResult<u64>;

    /// Loads every mapping in the order it was written
    fn load_identities(&self) -> StorageResult<Vec<IdentityRecord>>;

    /// Removes every mapping
    fn clear(&mut self) -> StorageResult<()>;

    /// Flushes and releases the backend; repeated calls are no-ops
    fn close(&mut self) -> StorageResult<()>;

    /// Whether `close` has been called
    fn is_closed(&self) -> bool;
}
