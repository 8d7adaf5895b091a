//! Storage module for persisting document identities
//!
//! This module handles all database operations for the identity store:
//! - SQLite database initialization and schema management
//! - Atomic put-if-absent of URL to doc id mappings
//! - Durable counting and export for crawl resumption

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteDocIdStorage;
pub use traits::{DocIdStorage, Durability, InsertOutcome, StorageError, StorageResult};

use crate::config::StorageConfig;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// File name of the identity database inside the storage location
pub const DOC_IDS_DB_FILE: &str = "doc_ids.db";

/// Path of the identity database for a storage location
pub fn database_path(location: &Path) -> PathBuf {
    location.join(DOC_IDS_DB_FILE)
}

/// Opens the identity database under the configured storage location
///
/// The location directory is created if missing. Resumable crawls get
/// synchronous writes; other crawls get deferred writes.
///
/// # Returns
///
/// * `Ok(SqliteDocIdStorage)` - Successfully opened storage
/// * `Err(StorageError)` - The directory or database could not be opened
pub fn open_storage(config: &StorageConfig) -> StorageResult<SqliteDocIdStorage> {
    std::fs::create_dir_all(&config.location)?;
    SqliteDocIdStorage::open(
        &database_path(&config.location),
        Durability::for_resumable(config.resumable_crawling),
    )
}

/// One stored URL to doc id mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    pub url: String,
    pub doc_id: String,
    pub assigned_at: DateTime<Utc>,
}
