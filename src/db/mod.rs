//! SQLite-backed storage for faces, people, and media ownership.

mod schema;
pub mod faces;
pub mod media;
pub mod people;

use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;

pub use faces::{
    bytes_to_embedding, embedding_to_bytes, format_embedding, parse_embedding, BoundingBox, Face,
};
pub use people::Person;

use crate::store::Atomic;
use schema::{MIGRATIONS, SCHEMA};

pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path` and bring the schema up
    /// to date.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// In-memory database for tests and short-lived tooling.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        for migration in MIGRATIONS {
            // Already-applied migrations fail and are skipped.
            let _ = self.conn.execute(migration, []);
        }
        Ok(())
    }
}

impl Atomic for Database {
    fn atomically<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        // An early return drops `tx`, which rolls the unit back.
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("visage.db");
        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(db.count_faces().unwrap(), 0);
    }

    #[test]
    fn initialize_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db.initialize().unwrap();
    }

    #[test]
    fn atomically_commits_on_ok() {
        let db = Database::open_in_memory().unwrap();
        db.atomically(|d| {
            d.create_person(1, "Ada", None)?;
            Ok(())
        })
        .unwrap();
        assert_eq!(db.count_people().unwrap(), 1);
    }

    #[test]
    fn atomically_rolls_back_on_err() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<()> = db.atomically(|d| {
            d.create_person(1, "Ada", None)?;
            anyhow::bail!("boom");
        });
        assert!(result.is_err());
        assert_eq!(db.count_people().unwrap(), 0);
    }
}
