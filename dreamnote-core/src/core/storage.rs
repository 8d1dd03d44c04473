//! SQLite connection ownership and schema bootstrap.

use std::path::Path;

use log::{debug, info};
use rusqlite::Connection;

use crate::{DreamError, Result};

/// Tables every journal database must contain.
const TABLES: [&str; 5] = ["notes", "tags", "note_types", "note_tags", "note_note_types"];

/// Owns the SQLite connection behind a [`crate::Journal`].
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Opens the database at `path`, creating the file if needed, and ensures the schema.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DreamError::Database`] if the file is not a SQLite
    /// database or the schema cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            info!("database already exists: {}", path.display());
        } else {
            info!("database does not exist, creating: {}", path.display());
        }
        let conn = Connection::open(path)?;
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Opens a private in-memory database with the schema applied.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

/// Creates any missing table. Safe to run against an already initialised database.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(include_str!("schema.sql"))?;
    check_tables(conn)?;
    debug!("schema ready ({} tables)", TABLES.len());
    Ok(())
}

/// Fails unless every journal table is present.
fn check_tables(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
    let present = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let missing: Vec<&str> = TABLES
        .into_iter()
        .filter(|t| !present.iter().any(|p| p == t))
        .collect();
    if !missing.is_empty() {
        return Err(DreamError::Validation(format!(
            "not a dream journal, missing tables: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn table_names(storage: &Storage) -> Vec<String> {
        storage
            .connection()
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_open_creates_schema() {
        let temp = NamedTempFile::new().unwrap();
        let storage = Storage::open(temp.path()).unwrap();

        let tables = table_names(&storage);
        for table in TABLES {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let temp = NamedTempFile::new().unwrap();
        {
            let storage = Storage::open(temp.path()).unwrap();
            storage
                .connection()
                .execute("INSERT INTO tags (label) VALUES ('eau')", [])
                .unwrap();
        }

        // Reopening runs the bootstrap again and must keep existing rows.
        let storage = Storage::open(temp.path()).unwrap();
        ensure_schema(storage.connection()).unwrap();
        let count: i64 = storage
            .connection()
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_open_invalid_database() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "not a database, just some text that is long enough")
            .unwrap();

        let result = Storage::open(temp.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory().unwrap();
        let known = table_names(&storage)
            .iter()
            .filter(|t| TABLES.contains(&t.as_str()))
            .count();
        assert_eq!(known, 5);
    }

    #[test]
    fn test_check_tables_reports_missing() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE notes (id INTEGER PRIMARY KEY)")
            .unwrap();

        match check_tables(&conn) {
            Err(DreamError::Validation(msg)) => {
                assert!(msg.contains("tags"));
                assert!(!msg.contains("notes,"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        let storage = Storage::open_in_memory().unwrap();
        assert!(check_tables(storage.connection()).is_ok());
    }
}
