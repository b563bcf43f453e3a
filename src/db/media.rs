//! Media rows exist so face queries can be scoped to an owner.

use anyhow::Result;
use rusqlite::params;

use super::Database;

impl Database {
    /// Register a media item for an owner, returning its id.
    pub fn add_media(&self, owner_id: i64, path: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO media (owner_id, path) VALUES (?, ?)",
            params![owner_id, path],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Owner of a media item, if it exists.
    pub fn media_owner(&self, media_id: i64) -> Result<Option<i64>> {
        let result = self.conn.query_row(
            "SELECT owner_id FROM media WHERE id = ?",
            [media_id],
            |row| row.get(0),
        );

        match result {
            Ok(owner) => Ok(Some(owner)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_media_records_owner() {
        let db = Database::open_in_memory().unwrap();
        let id = db.add_media(42, "/photos/trip/0001.jpg").unwrap();
        assert_eq!(db.media_owner(id).unwrap(), Some(42));
        assert_eq!(db.media_owner(id + 1).unwrap(), None);
    }
}
