//! Person rows: named identities and their face-count aggregate.

use anyhow::{bail, Result};
use rusqlite::{params, Row};

use super::Database;
use crate::store::PersonStore;

/// A named identity owned by one user.
#[derive(Debug, Clone)]
pub struct Person {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub thumbnail_path: Option<String>,
    /// Cached count of linked faces, recomputed on every link change.
    pub face_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

fn person_from_row(row: &Row) -> rusqlite::Result<Person> {
    Ok(Person {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        thumbnail_path: row.get(4)?,
        face_count: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl Database {
    /// Create a person with no faces yet. Names must be non-empty.
    pub fn create_person(
        &self,
        owner_id: i64,
        name: &str,
        description: Option<&str>,
    ) -> Result<i64> {
        if name.trim().is_empty() {
            bail!("person name must not be empty");
        }
        self.conn.execute(
            "INSERT INTO people (owner_id, name, description) VALUES (?, ?, ?)",
            params![owner_id, name, description],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Find a person by name (case-insensitive) among one owner's people.
    pub fn find_person_by_name(&self, owner_id: i64, name: &str) -> Result<Option<Person>> {
        let result = self.conn.query_row(
            r#"
            SELECT id, owner_id, name, description, thumbnail_path, face_count, created_at, updated_at
            FROM people
            WHERE owner_id = ? AND LOWER(name) = LOWER(?)
            "#,
            params![owner_id, name],
            person_from_row,
        );

        match result {
            Ok(person) => Ok(Some(person)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Case-insensitive substring search over an owner's people.
    pub fn search_people(&self, owner_id: i64, query: &str) -> Result<Vec<Person>> {
        let pattern = format!("%{}%", query);
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, owner_id, name, description, thumbnail_path, face_count, created_at, updated_at
            FROM people
            WHERE owner_id = ? AND LOWER(name) LIKE LOWER(?)
            ORDER BY name
            "#,
        )?;

        let people = stmt
            .query_map(params![owner_id, pattern], person_from_row)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(people)
    }

    /// Total number of people across all owners.
    pub fn count_people(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM people", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl PersonStore for Database {
    fn person_by_id(&self, person_id: i64) -> Result<Option<Person>> {
        let result = self.conn.query_row(
            r#"
            SELECT id, owner_id, name, description, thumbnail_path, face_count, created_at, updated_at
            FROM people
            WHERE id = ?
            "#,
            [person_id],
            person_from_row,
        );

        match result {
            Ok(person) => Ok(Some(person)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn people_by_face_count(&self, owner_id: i64) -> Result<Vec<Person>> {
        // Established identities first; id breaks ties so iteration
        // order is stable.
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, owner_id, name, description, thumbnail_path, face_count, created_at, updated_at
            FROM people
            WHERE owner_id = ?
            ORDER BY face_count DESC, id
            "#,
        )?;

        let people = stmt
            .query_map([owner_id], person_from_row)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(people)
    }

    fn save_person(&self, person: &Person) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE people
            SET name = ?, description = ?, thumbnail_path = ?, face_count = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![
                person.name,
                person.description,
                person.thumbnail_path,
                person.face_count,
                person.id,
            ],
        )?;
        Ok(())
    }

    fn delete_person(&self, person_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM people WHERE id = ?", params![person_id])?;
        Ok(())
    }
}
