pub const SCHEMA: &str = r#"
-- Media items: faces are scoped to an owner through these
CREATE TABLE IF NOT EXISTS media (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id INTEGER NOT NULL,
    path TEXT NOT NULL,
    added_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_media_owner ON media(owner_id);

-- People: named identities, one owner each
CREATE TABLE IF NOT EXISTS people (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    thumbnail_path TEXT,          -- representative face image
    face_count INTEGER NOT NULL DEFAULT 0,  -- recomputed from faces on every link change
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_people_owner ON people(owner_id);
CREATE INDEX IF NOT EXISTS idx_people_face_count ON people(face_count);

-- Faces: detected faces with bounding boxes and embeddings
CREATE TABLE IF NOT EXISTS faces (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    media_id INTEGER NOT NULL,
    bbox_x INTEGER NOT NULL,
    bbox_y INTEGER NOT NULL,
    bbox_w INTEGER NOT NULL,
    bbox_h INTEGER NOT NULL,
    confidence REAL,              -- detection confidence (0-1)
    embedding BLOB,               -- float32 array as little-endian bytes
    embedding_dim INTEGER,
    person_id INTEGER,            -- NULL until assigned
    is_verified INTEGER NOT NULL DEFAULT 0,  -- human-confirmed assignment
    detected_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (media_id) REFERENCES media(id) ON DELETE CASCADE,
    FOREIGN KEY (person_id) REFERENCES people(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_faces_media ON faces(media_id);
CREATE INDEX IF NOT EXISTS idx_faces_person ON faces(person_id);
"#;

/// Additive migrations for databases created before a column existed.
pub const MIGRATIONS: &[&str] = &[
    "ALTER TABLE people ADD COLUMN description TEXT",
    "ALTER TABLE people ADD COLUMN thumbnail_path TEXT",
];
