//! Database schema definitions
//!
//! The identity store keeps a single table, `doc_ids`, keyed by canonical URL.

/// Schema version written to `PRAGMA user_version`
pub const SCHEMA_VERSION: u32 = 1;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per canonical URL ever assigned a doc id
CREATE TABLE IF NOT EXISTS doc_ids (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    doc_id TEXT NOT NULL UNIQUE,
    assigned_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Returns
///
/// * `Ok(u32)` - The schema version found before initialization (0 for a new file)
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<u32, rusqlite::Error> {
    let found = schema_version(conn)?;
    conn.execute_batch(SCHEMA_SQL)?;
    if found < SCHEMA_VERSION {
        conn.execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))?;
    }
    Ok(found)
}

/// Reads the schema version stored in the database file
pub fn schema_version(conn: &rusqlite::Connection) -> Result<u32, rusqlite::Error> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}
