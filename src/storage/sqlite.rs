//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the DocIdStorage trait.

use crate::storage::schema::{initialize_schema, schema_version, SCHEMA_VERSION};
use crate::storage::traits::{DocIdStorage, Durability, InsertOutcome, StorageError, StorageResult};
use crate::storage::IdentityRecord;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

/// How long a writer waits for another process holding the write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite document id backend
pub struct SqliteDocIdStorage {
    conn: Option<Connection>,
    durability: Durability,
}

impl SqliteDocIdStorage {
    /// Opens or creates the database file at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `durability` - Whether each write is synced before returning
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteDocIdStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path, durability: Durability) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        match durability {
            Durability::Synchronous => conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = FULL;
            ",
            )?,
            Durability::Deferred => conn.execute_batch(
                "
                PRAGMA journal_mode = MEMORY;
                PRAGMA synchronous = OFF;
            ",
            )?,
        }

        Self::from_connection(conn, durability)
    }

    /// Creates an in-memory database; nothing survives the process
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, Durability::Deferred)
    }

    fn from_connection(conn: Connection, durability: Durability) -> StorageResult<Self> {
        let found = schema_version(&conn)?;
        if found > SCHEMA_VERSION {
            return Err(StorageError::UnsupportedSchema {
                found,
                supported: SCHEMA_VERSION,
            });
        }
        initialize_schema(&conn)?;

        Ok(Self {
            conn: Some(conn),
            durability,
        })
    }

    pub fn durability(&self) -> Durability {
        self.durability
    }

    fn conn(&self) -> StorageResult<&Connection> {
        self.conn.as_ref().ok_or(StorageError::Closed)
    }

    fn conn_mut(&mut self) -> StorageResult<&mut Connection> {
        self.conn.as_mut().ok_or(StorageError::Closed)
    }
}

impl DocIdStorage for SqliteDocIdStorage {
    fn get_doc_id(&self, url: &str) -> StorageResult<Option<String>> {
        let doc_id = self
            .conn()?
            .query_row(
                "SELECT doc_id FROM doc_ids WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;

        Ok(doc_id)
    }

    fn insert_if_absent(&mut self, url: &str, doc_id: &str) -> StorageResult<InsertOutcome> {
        // IMMEDIATE takes the write lock up front, so the check and the insert
        // are atomic across connections and processes.
        let tx = self
            .conn_mut()?
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT doc_id FROM doc_ids WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(existing) = existing {
            return Ok(InsertOutcome::Existing(existing));
        }

        let taken: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM doc_ids WHERE doc_id = ?1)",
            params![doc_id],
            |row| row.get(0),
        )?;

        if taken {
            return Ok(InsertOutcome::IdTaken);
        }

        let now = Utc::now().to_rfc3339();
        tx.execute(
            "INSERT INTO doc_ids (url, doc_id, assigned_at) VALUES (?1, ?2, ?3)",
            params![url, doc_id, now],
        )?;
        tx.commit()?;

        Ok(InsertOutcome::Inserted)
    }

    fn count_doc_ids(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM doc_ids", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn load_identities(&self) -> StorageResult<Vec<IdentityRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT url, doc_id, assigned_at FROM doc_ids ORDER BY seq")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(url, doc_id, assigned_at)| {
                let assigned_at = assigned_at.parse::<DateTime<Utc>>().map_err(|e| {
                    StorageError::Serialization(format!(
                        "Bad assigned_at '{}' for {}: {}",
                        assigned_at, url, e
                    ))
                })?;
                Ok(IdentityRecord {
                    url,
                    doc_id,
                    assigned_at,
                })
            })
            .collect()
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.conn()?.execute("DELETE FROM doc_ids", [])?;
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };

        if self.durability == Durability::Synchronous {
            // Fold the WAL back into the main file so a copied database is complete.
            let busy: i64 = conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |row| row.get(0))?;
            if busy != 0 {
                tracing::debug!("WAL checkpoint deferred: database is in use by another connection");
            }
        }

        conn.close().map_err(|(_, e)| StorageError::Sqlite(e))
    }

    fn is_closed(&self) -> bool {
        self.conn.is_none()
    }
}

impl Drop for SqliteDocIdStorage {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!("Failed to close document id storage: {}", e);
        }
    }
}
