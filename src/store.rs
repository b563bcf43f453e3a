//! Capability traits the engine consumes.
//!
//! The engine never talks to storage directly; it is generic over these
//! traits so the SQLite backing in [`crate::db`] stays replaceable.

use anyhow::Result;

use crate::db::{Face, Person};

/// Face queries plus the single mutation surface the engine needs.
pub trait FaceStore {
    fn face_by_id(&self, face_id: i64) -> Result<Option<Face>>;

    /// All faces assigned to a person, in stable store order.
    fn faces_for_person(&self, person_id: i64) -> Result<Vec<Face>>;

    /// All faces detected in one media item.
    fn faces_for_media(&self, media_id: i64) -> Result<Vec<Face>>;

    /// Unassigned faces across an owner's media, in stable store order.
    fn unassigned_faces(&self, owner_id: i64) -> Result<Vec<Face>>;

    /// Authoritative count of faces linked to a person.
    fn count_faces_for_person(&self, person_id: i64) -> Result<i64>;

    /// Persist a face's person link and verified flag.
    fn save_face(&self, face: &Face) -> Result<()>;
}

/// Person queries and mutations.
pub trait PersonStore {
    fn person_by_id(&self, person_id: i64) -> Result<Option<Person>>;

    /// An owner's people, largest face count first.
    fn people_by_face_count(&self, owner_id: i64) -> Result<Vec<Person>>;

    /// Persist name, description, thumbnail path and face count.
    fn save_person(&self, person: &Person) -> Result<()>;

    fn delete_person(&self, person_id: i64) -> Result<()>;
}

/// Transactional execution. Merging two people requires it: no partial
/// merge state may be observable to other readers.
pub trait Atomic {
    /// Run `f` inside a storage transaction, committing on `Ok` and
    /// rolling the whole unit back on `Err`.
    fn atomically<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T>
    where
        Self: Sized;
}
