//! Face rows: detection results and their person links.

use anyhow::Result;
use rusqlite::{params, Row};

use super::Database;
use crate::store::FaceStore;

/// Bounding box of a detected face within its media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// One detected face in one media item.
///
/// The assignment engine only ever mutates `person_id` and `verified`;
/// everything else is written once by the detector.
#[derive(Debug, Clone)]
pub struct Face {
    pub id: i64,
    pub media_id: i64,
    /// Owner of the containing media item, filled in on load.
    pub owner_id: i64,
    pub bbox: BoundingBox,
    pub confidence: Option<f32>,
    pub embedding: Option<Vec<f32>>,
    pub person_id: Option<i64>,
    pub verified: bool,
    pub detected_at: String,
}

fn face_from_row(row: &Row) -> rusqlite::Result<Face> {
    let embedding_bytes: Option<Vec<u8>> = row.get(8)?;
    Ok(Face {
        id: row.get(0)?,
        media_id: row.get(1)?,
        owner_id: row.get(2)?,
        bbox: BoundingBox {
            x: row.get(3)?,
            y: row.get(4)?,
            width: row.get(5)?,
            height: row.get(6)?,
        },
        confidence: row.get(7)?,
        embedding: embedding_bytes.map(|b| bytes_to_embedding(&b)),
        person_id: row.get(9)?,
        verified: row.get(10)?,
        detected_at: row.get(11)?,
    })
}

impl Database {
    /// Store a detected face. This is the detector's entry point; the
    /// face starts out unassigned and unverified.
    pub fn store_face(
        &self,
        media_id: i64,
        bbox: &BoundingBox,
        confidence: Option<f32>,
        embedding: Option<&[f32]>,
    ) -> Result<i64> {
        let embedding_bytes = embedding.map(embedding_to_bytes);
        let embedding_dim = embedding.map(|e| e.len() as i64);

        self.conn.execute(
            r#"
            INSERT INTO faces (media_id, bbox_x, bbox_y, bbox_w, bbox_h, confidence, embedding, embedding_dim)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                media_id,
                bbox.x,
                bbox.y,
                bbox.width,
                bbox.height,
                confidence,
                embedding_bytes,
                embedding_dim,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Total number of stored faces.
    pub fn count_faces(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM faces", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl FaceStore for Database {
    fn face_by_id(&self, face_id: i64) -> Result<Option<Face>> {
        let result = self.conn.query_row(
            r#"
            SELECT f.id, f.media_id, m.owner_id, f.bbox_x, f.bbox_y, f.bbox_w, f.bbox_h,
                   f.confidence, f.embedding, f.person_id, f.is_verified, f.detected_at
            FROM faces f
            JOIN media m ON f.media_id = m.id
            WHERE f.id = ?
            "#,
            [face_id],
            face_from_row,
        );

        match result {
            Ok(face) => Ok(Some(face)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn faces_for_person(&self, person_id: i64) -> Result<Vec<Face>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT f.id, f.media_id, m.owner_id, f.bbox_x, f.bbox_y, f.bbox_w, f.bbox_h,
                   f.confidence, f.embedding, f.person_id, f.is_verified, f.detected_at
            FROM faces f
            JOIN media m ON f.media_id = m.id
            WHERE f.person_id = ?
            ORDER BY f.id
            "#,
        )?;

        let faces = stmt
            .query_map([person_id], face_from_row)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(faces)
    }

    fn faces_for_media(&self, media_id: i64) -> Result<Vec<Face>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT f.id, f.media_id, m.owner_id, f.bbox_x, f.bbox_y, f.bbox_w, f.bbox_h,
                   f.confidence, f.embedding, f.person_id, f.is_verified, f.detected_at
            FROM faces f
            JOIN media m ON f.media_id = m.id
            WHERE f.media_id = ?
            ORDER BY f.id
            "#,
        )?;

        let faces = stmt
            .query_map([media_id], face_from_row)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(faces)
    }

    fn unassigned_faces(&self, owner_id: i64) -> Result<Vec<Face>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT f.id, f.media_id, m.owner_id, f.bbox_x, f.bbox_y, f.bbox_w, f.bbox_h,
                   f.confidence, f.embedding, f.person_id, f.is_verified, f.detected_at
            FROM faces f
            JOIN media m ON f.media_id = m.id
            WHERE f.person_id IS NULL AND m.owner_id = ?
            ORDER BY f.id
            "#,
        )?;

        let faces = stmt
            .query_map([owner_id], face_from_row)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(faces)
    }

    fn count_faces_for_person(&self, person_id: i64) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM faces WHERE person_id = ?",
            [person_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn save_face(&self, face: &Face) -> Result<()> {
        self.conn.execute(
            "UPDATE faces SET person_id = ?, is_verified = ? WHERE id = ?",
            params![face.person_id, face.verified, face.id],
        )?;
        Ok(())
    }
}

// ============================================================================
// Embedding codecs
// ============================================================================

/// Convert an embedding to little-endian bytes for storage.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &val in embedding {
        bytes.extend_from_slice(&val.to_le_bytes());
    }
    bytes
}

/// Convert stored bytes back to an embedding.
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let arr: [u8; 4] = chunk.try_into().unwrap();
            f32::from_le_bytes(arr)
        })
        .collect()
}

/// Parse a detector-supplied comma-separated embedding.
///
/// Empty or malformed input yields `None`; a face without a usable
/// embedding simply never matches anything.
pub fn parse_embedding(text: &str) -> Option<Vec<f32>> {
    if text.trim().is_empty() {
        return None;
    }
    text.split(',')
        .map(|v| v.trim().parse::<f32>().ok())
        .collect()
}

/// Format an embedding in the comma-separated form detectors exchange.
pub fn format_embedding(embedding: &[f32]) -> String {
    embedding
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox() -> BoundingBox {
        BoundingBox {
            x: 10,
            y: 20,
            width: 64,
            height: 64,
        }
    }

    #[test]
    fn embedding_bytes_round_trip() {
        let embedding = vec![0.25_f32, -1.5, 3.0, 0.0];
        let bytes = embedding_to_bytes(&embedding);
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes_to_embedding(&bytes), embedding);
    }

    #[test]
    fn csv_embedding_round_trip() {
        let embedding = vec![0.5_f32, -0.25, 1.0];
        let text = format_embedding(&embedding);
        assert_eq!(parse_embedding(&text), Some(embedding));
    }

    #[test]
    fn parse_embedding_rejects_garbage() {
        assert_eq!(parse_embedding(""), None);
        assert_eq!(parse_embedding("   "), None);
        assert_eq!(parse_embedding("0.5,abc"), None);
    }

    #[test]
    fn store_and_load_face() {
        let db = Database::open_in_memory().unwrap();
        let media_id = db.add_media(7, "/photos/a.jpg").unwrap();
        let face_id = db
            .store_face(media_id, &bbox(), Some(0.95), Some(&[1.0, 0.0]))
            .unwrap();

        let face = db.face_by_id(face_id).unwrap().unwrap();
        assert_eq!(face.media_id, media_id);
        assert_eq!(face.owner_id, 7);
        assert_eq!(face.bbox, bbox());
        assert_eq!(face.embedding, Some(vec![1.0, 0.0]));
        assert_eq!(face.person_id, None);
        assert!(!face.verified);
    }

    #[test]
    fn faces_for_media_lists_detections_in_order() {
        let db = Database::open_in_memory().unwrap();
        let group_photo = db.add_media(1, "/photos/group.jpg").unwrap();
        let other = db.add_media(1, "/photos/other.jpg").unwrap();
        let f1 = db.store_face(group_photo, &bbox(), None, None).unwrap();
        let f2 = db.store_face(group_photo, &bbox(), None, None).unwrap();
        db.store_face(other, &bbox(), None, None).unwrap();

        let faces = db.faces_for_media(group_photo).unwrap();
        let ids: Vec<i64> = faces.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![f1, f2]);
    }

    #[test]
    fn unassigned_faces_are_scoped_to_owner() {
        let db = Database::open_in_memory().unwrap();
        let mine = db.add_media(1, "/photos/mine.jpg").unwrap();
        let theirs = db.add_media(2, "/photos/theirs.jpg").unwrap();
        let my_face = db.store_face(mine, &bbox(), None, None).unwrap();
        db.store_face(theirs, &bbox(), None, None).unwrap();

        let unassigned = db.unassigned_faces(1).unwrap();
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].id, my_face);
    }

    #[test]
    fn save_face_persists_link_and_verified() {
        let db = Database::open_in_memory().unwrap();
        let media_id = db.add_media(1, "/photos/a.jpg").unwrap();
        let face_id = db.store_face(media_id, &bbox(), None, None).unwrap();
        let person_id = db.create_person(1, "Ada", None).unwrap();

        let mut face = db.face_by_id(face_id).unwrap().unwrap();
        face.person_id = Some(person_id);
        face.verified = true;
        db.save_face(&face).unwrap();

        let reloaded = db.face_by_id(face_id).unwrap().unwrap();
        assert_eq!(reloaded.person_id, Some(person_id));
        assert!(reloaded.verified);
        assert_eq!(db.count_faces_for_person(person_id).unwrap(), 1);
        assert!(db.unassigned_faces(1).unwrap().is_empty());
    }
}
