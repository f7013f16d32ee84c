//! SQLite connection ownership, schema creation and additive migrations.

use crate::{NotecaseError, Result};
use log::info;
use rusqlite::Connection;
use std::path::Path;

/// Tables every Notecase database must contain.
const REQUIRED_TABLES: [&str; 5] = ["folders", "notes", "tags", "note_tags", "operations"];

/// Columns added after the first schema version, with the DDL that adds them.
const COLUMN_MIGRATIONS: [(&str, &str, &str); 4] = [
    (
        "folders",
        "is_favorite",
        "ALTER TABLE folders ADD COLUMN is_favorite INTEGER NOT NULL DEFAULT 0",
    ),
    (
        "notes",
        "is_favorite",
        "ALTER TABLE notes ADD COLUMN is_favorite INTEGER NOT NULL DEFAULT 0",
    ),
    (
        "folders",
        "is_public",
        "ALTER TABLE folders ADD COLUMN is_public INTEGER NOT NULL DEFAULT 0",
    ),
    (
        "notes",
        "is_public",
        "ALTER TABLE notes ADD COLUMN is_public INTEGER NOT NULL DEFAULT 0",
    ),
];

pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Creates (or initialises) a database at `path` with the full schema.
    ///
    /// # Errors
    ///
    /// Returns [`NotecaseError::Database`] if the file cannot be opened or
    /// the schema cannot be applied.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self { conn })
    }

    /// Opens an existing database, validating its structure and applying
    /// any pending column migrations.
    ///
    /// # Errors
    ///
    /// Returns [`NotecaseError::InvalidDatabase`] if required tables are
    /// missing, or [`NotecaseError::Database`] for any SQLite failure
    /// (including a file that is not a database at all).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", true)?;

        let placeholders = vec!["?"; REQUIRED_TABLES.len()].join(", ");
        let table_count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ({placeholders})"
            ),
            rusqlite::params_from_iter(REQUIRED_TABLES),
            |row| row.get(0),
        )?;

        if table_count != REQUIRED_TABLES.len() as i64 {
            return Err(NotecaseError::InvalidDatabase(
                "Not a valid Notecase database".to_string(),
            ));
        }

        for (table, column, ddl) in COLUMN_MIGRATIONS {
            let column_exists: bool = conn.query_row(
                "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
                [table, column],
                |row| row.get::<_, i64>(0).map(|count| count > 0),
            )?;
            if !column_exists {
                info!("migrating: adding {table}.{column}");
                conn.execute(ddl, [])?;
            }
        }

        // Tables introduced later than the originals are simply created.
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS workspace_meta (key TEXT PRIMARY KEY, value TEXT);",
        )?;

        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
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
    fn test_create_storage() {
        let temp = NamedTempFile::new().unwrap();
        let storage = Storage::create(temp.path()).unwrap();

        let tables = table_names(&storage);
        for table in REQUIRED_TABLES {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
        assert!(tables.contains(&"workspace_meta".to_string()));
    }

    #[test]
    fn test_open_existing_storage() {
        let temp = NamedTempFile::new().unwrap();
        Storage::create(temp.path()).unwrap();

        let storage = Storage::open(temp.path()).unwrap();
        assert!(table_names(&storage).contains(&"folders".to_string()));
    }

    #[test]
    fn test_open_invalid_database() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "not a database").unwrap();

        assert!(Storage::open(temp.path()).is_err());
    }

    #[test]
    fn test_open_empty_database_is_rejected() {
        let temp = NamedTempFile::new().unwrap();
        let err = Storage::open(temp.path()).err().unwrap();
        assert!(matches!(err, NotecaseError::InvalidDatabase(_)));
    }

    #[test]
    fn test_migration_adds_favorite_columns() {
        let temp = NamedTempFile::new().unwrap();

        // Schema from before favourites existed.
        {
            let conn = Connection::open(temp.path()).unwrap();
            conn.execute_batch(
                "CREATE TABLE folders (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    parent_id INTEGER,
                    position INTEGER NOT NULL DEFAULT 0,
                    is_public INTEGER NOT NULL DEFAULT 0,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE TABLE notes (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    content TEXT NOT NULL,
                    folder_id INTEGER,
                    position INTEGER NOT NULL DEFAULT 0,
                    is_public INTEGER NOT NULL DEFAULT 0,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE TABLE tags (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE,
                    color TEXT NOT NULL DEFAULT '#6b7280', description TEXT,
                    created_at INTEGER NOT NULL, updated_at INTEGER NOT NULL);
                CREATE TABLE note_tags (id INTEGER PRIMARY KEY, note_id INTEGER NOT NULL,
                    tag_id INTEGER NOT NULL, created_at INTEGER NOT NULL);
                CREATE TABLE operations (id INTEGER PRIMARY KEY AUTOINCREMENT,
                    operation_id TEXT NOT NULL, timestamp INTEGER NOT NULL,
                    operation_type TEXT NOT NULL, target_id INTEGER,
                    operation_data TEXT NOT NULL);
                INSERT INTO folders (name, position, created_at, updated_at)
                    VALUES ('Legacy', 0, 1, 1);",
            )
            .unwrap();
        }

        let storage = Storage::open(temp.path()).unwrap();

        for table in ["folders", "notes"] {
            let exists: bool = storage
                .connection()
                .query_row(
                    "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name='is_favorite'",
                    [table],
                    |row| row.get::<_, i64>(0).map(|count| count > 0),
                )
                .unwrap();
            assert!(exists, "{table}.is_favorite should exist after migration");
        }

        let fav: i64 = storage
            .connection()
            .query_row("SELECT is_favorite FROM folders WHERE name='Legacy'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(fav, 0);
    }
}
