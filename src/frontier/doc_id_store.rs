use crate::config::StorageConfig;
use crate::storage::{
    database_path, open_storage, DocIdStorage, IdentityRecord, InsertOutcome, SqliteDocIdStorage,
    StorageError,
};
use crate::url::{Canonicalizer, UrlCanonicalizer};
use crate::{FrontierError, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Opaque, non-empty document identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocId(String);

impl DocId {
    /// Wraps an externally supplied id
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(FrontierError::InvalidArgument(
                "DocId may not be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<DocId> for String {
    fn from(id: DocId) -> Self {
        id.0
    }
}

/// A canonical URL together with the id it was assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentIdentity {
    pub canonical_url: String,
    pub doc_id: DocId,
    pub assigned_at: DateTime<Utc>,
}

impl From<IdentityRecord> for DocumentIdentity {
    fn from(record: IdentityRecord) -> Self {
        Self {
            canonical_url: record.url,
            doc_id: DocId(record.doc_id),
            assigned_at: record.assigned_at,
        }
    }
}

struct StoreState<S> {
    storage: S,
    last_doc_id: u64,
}

/// Durable, crash-resumable map from canonical URL to document id
///
/// One mutex serializes all calls in this process; the backend's own
/// transactional insert is what keeps ids unique across processes. The
/// store is opened once at crawl start, shared by reference with every
/// worker, and closed once at crawl end.
pub struct DocumentIdentityStore<S: DocIdStorage = SqliteDocIdStorage> {
    state: Mutex<StoreState<S>>,
    canonicalizer: Box<dyn Canonicalizer>,
}

impl DocumentIdentityStore<SqliteDocIdStorage> {
    /// Opens the SQLite-backed store under the configured storage location
    ///
    /// # Returns
    ///
    /// * `Ok(DocumentIdentityStore)` - The store, with its counter resumed from disk
    /// * `Err(FrontierError::StorageUnavailable)` - The database could not be opened
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let storage = open_storage(config).map_err(|source| FrontierError::StorageUnavailable {
            path: database_path(&config.location),
            source,
        })?;
        Self::with_storage(storage, config.resumable_crawling)
    }
}

impl<S: DocIdStorage> DocumentIdentityStore<S> {
    /// Builds a store on top of an already opened backend
    ///
    /// A non-resumable crawl starts from an empty "seen" set, so anything a
    /// previous run left in the backend is discarded.
    pub fn with_storage(mut storage: S, resumable_crawling: bool) -> Result<Self> {
        if !resumable_crawling {
            let stale = storage.count_doc_ids()?;
            if stale > 0 {
                tracing::info!(
                    "Discarding {} doc ids left by a previous non-resumable crawl",
                    stale
                );
                storage.clear()?;
            }
        }

        let doc_count = storage.count_doc_ids()?;
        if doc_count > 0 {
            tracing::info!(
                "Resuming with {} doc ids from a previous crawl",
                doc_count
            );
        }

        Ok(Self {
            state: Mutex::new(StoreState {
                storage,
                last_doc_id: doc_count,
            }),
            canonicalizer: Box::new(UrlCanonicalizer),
        })
    }

    /// Replaces the canonicalizer used by [`is_seen_before`](Self::is_seen_before)
    pub fn with_canonicalizer(mut self, canonicalizer: Box<dyn Canonicalizer>) -> Self {
        self.canonicalizer = canonicalizer;
        self
    }

    /// Returns the doc id of an already seen canonical URL
    ///
    /// Absence is `Ok(None)`. A backend failure is an error, never "unseen".
    pub fn lookup(&self, canonical_url: &str) -> Result<Option<DocId>> {
        let url = require_url(canonical_url)?;
        let state = self.lock_state();

        let doc_id = state
            .storage
            .get_doc_id(url)
            .map_err(|e| storage_failure("getting doc id", url, e))?;

        Ok(doc_id.map(DocId))
    }

    /// Returns the doc id of `canonical_url`, assigning the next one if it has none
    ///
    /// Concurrent callers for the same URL all get the same id and exactly
    /// one mapping is written. The mapping is committed before this returns.
    pub fn assign_if_absent(&self, canonical_url: &str) -> Result<DocId> {
        let url = require_url(canonical_url)?;
        let mut state = self.lock_state();

        if let Some(existing) = state
            .storage
            .get_doc_id(url)
            .map_err(|e| storage_failure("getting doc id", url, e))?
        {
            return Ok(DocId(existing));
        }

        loop {
            let candidate = state.last_doc_id + 1;
            let doc_id = candidate.to_string();

            let outcome = state
                .storage
                .insert_if_absent(url, &doc_id)
                .map_err(|e| storage_failure("assigning new doc id", url, e))?;

            match outcome {
                InsertOutcome::Inserted => {
                    state.last_doc_id = candidate;
                    return Ok(DocId(doc_id));
                }
                // Another process sharing the backend got there first.
                InsertOutcome::Existing(existing) => return Ok(DocId(existing)),
                InsertOutcome::IdTaken => {
                    tracing::warn!(
                        "Doc id {} is already in use, advancing the sequence",
                        doc_id
                    );
                    state.last_doc_id = candidate;
                }
            }
        }
    }

    /// Records an externally supplied doc id for `canonical_url`
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The mapping was written, or already existed with the same id
    /// * `Err(FrontierError::Conflict)` - The URL already has a different id
    /// * `Err(FrontierError::DuplicateDocId)` - The id belongs to another URL
    /// * `Err(FrontierError::InvalidArgument)` - The URL or id is empty
    pub fn assign_explicit(&self, canonical_url: &str, doc_id: &str) -> Result<()> {
        let url = require_url(canonical_url)?;
        let doc_id = DocId::new(doc_id)?;
        let mut state = self.lock_state();

        let outcome = state
            .storage
            .insert_if_absent(url, doc_id.as_str())
            .map_err(|e| storage_failure("adding explicit doc id", url, e))?;

        match outcome {
            InsertOutcome::Inserted => Ok(()),
            InsertOutcome::Existing(existing) if existing == doc_id.as_str() => Ok(()),
            InsertOutcome::Existing(existing) => Err(FrontierError::Conflict {
                url: url.to_string(),
                existing,
                requested: doc_id.into(),
            }),
            InsertOutcome::IdTaken => Err(FrontierError::DuplicateDocId {
                url: url.to_string(),
                doc_id: doc_id.into(),
            }),
        }
    }

    /// Whether `url` has been assigned a doc id
    ///
    /// The input is canonicalized first, so raw and canonical URLs both work.
    pub fn is_seen_before(&self, url: &str) -> Result<bool> {
        let canonical = self.canonicalizer.canonicalize(url)?;
        Ok(self.lookup(&canonical)?.is_some())
    }

    /// Number of assigned identities, read from the backend
    pub fn count(&self) -> Result<u64> {
        let state = self.lock_state();
        state.storage.count_doc_ids().map_err(|e| {
            tracing::error!("Failed to count doc ids: {}", e);
            FrontierError::StorageIo(e)
        })
    }

    /// Every identity in assignment order
    pub fn identities(&self) -> Result<Vec<DocumentIdentity>> {
        let state = self.lock_state();
        let records = state.storage.load_identities()?;
        Ok(records.into_iter().map(DocumentIdentity::from).collect())
    }

    /// Last sequence number handed out (or resumed from disk)
    pub fn last_doc_id(&self) -> u64 {
        self.lock_state().last_doc_id
    }

    /// Releases the backend; safe to call more than once
    pub fn close(&self) -> Result<()> {
        let mut state = self.lock_state();
        state.storage.close().map_err(|e| {
            tracing::error!("Failed to close document identity store: {}", e);
            FrontierError::StorageIo(e)
        })
    }

    pub fn is_closed(&self) -> bool {
        self.lock_state().storage.is_closed()
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState<S>> {
        // Backend writes are transactional and the counter only moves after a
        // successful insert, so a panic while holding the lock leaves nothing half-done.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn require_url(url: &str) -> Result<&str> {
    if url.trim().is_empty() {
        return Err(FrontierError::InvalidArgument(
            "URL may not be empty".to_string(),
        ));
    }
    Ok(url)
}

fn storage_failure(action: &str, url: &str, e: StorageError) -> FrontierError {
    tracing::error!("Storage failure while {} for {}: {}", action, url, e);
    FrontierError::StorageIo(e)
}
