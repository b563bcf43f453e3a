//! Face-to-person assignment, merging, and suggestion ranking.
//!
//! Every mutating operation here recomputes `face_count` from the
//! authoritative face links instead of applying deltas, so the aggregate
//! stays correct even when operations overlap or partially fail.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use tracing::{info, warn};

use super::similarity::face_similarity;
use super::{
    AUTO_ASSIGN_REPRESENTATIVES, MAX_SUGGESTIONS, SIMILARITY_THRESHOLD,
    SUGGESTION_REPRESENTATIVES, SUGGESTION_THRESHOLD_FACTOR,
};
use crate::db::{Database, Face, Person};
use crate::error::{Error, Result};
use crate::store::{Atomic, FaceStore, PersonStore};
use crate::tasks::{BackgroundTaskManager, TaskId, TaskProgress, TaskUpdate};

/// What a completed auto-assignment pass processed.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoAssignOutcome {
    /// Unassigned faces considered.
    pub attempted: usize,
    /// Faces that ended up linked to a person.
    pub assigned: usize,
}

/// One ranked identity candidate for a face.
#[derive(Debug, Clone)]
pub struct PersonSuggestion {
    pub person_id: i64,
    pub person_name: String,
    pub similarity: f32,
    pub face_count: i64,
}

/// Link a face to a person as a human-confirmed assignment.
pub fn assign_face<S>(store: &S, face_id: i64, person_id: i64) -> Result<Face>
where
    S: FaceStore + PersonStore,
{
    let mut face = store
        .face_by_id(face_id)?
        .ok_or(Error::FaceNotFound(face_id))?;
    let mut person = store
        .person_by_id(person_id)?
        .ok_or(Error::PersonNotFound(person_id))?;

    face.person_id = Some(person.id);
    face.verified = true;
    store.save_face(&face)?;

    person.face_count = store.count_faces_for_person(person.id)?;
    store.save_person(&person)?;

    info!("assigned face {} to person {}", face_id, person_id);
    Ok(face)
}

/// Clear a face's person link. Unassigning an already-unassigned face
/// persists the cleared state and touches no person.
pub fn unassign_face<S>(store: &S, face_id: i64) -> Result<Face>
where
    S: FaceStore + PersonStore,
{
    let mut face = store
        .face_by_id(face_id)?
        .ok_or(Error::FaceNotFound(face_id))?;
    let previous_person = face.person_id;

    face.person_id = None;
    face.verified = false;
    store.save_face(&face)?;

    if let Some(person_id) = previous_person {
        // The person may have been deleted out from under us; that is
        // fine, there is no count left to fix.
        if let Some(mut person) = store.person_by_id(person_id)? {
            person.face_count = store.count_faces_for_person(person_id)?;
            store.save_person(&person)?;
        }
    }

    info!("unassigned face {}", face_id);
    Ok(face)
}

/// A person's score for a face: the maximum similarity over up to
/// `limit` of their faces, in store order.
fn person_score<S: FaceStore>(
    store: &S,
    face: &Face,
    person: &Person,
    limit: usize,
) -> anyhow::Result<f32> {
    let representatives = store.faces_for_person(person.id)?;

    let mut max_similarity = 0.0_f32;
    for representative in representatives.iter().take(limit) {
        let score = face_similarity(face, representative);
        if score > max_similarity {
            max_similarity = score;
        }
    }

    Ok(max_similarity)
}

/// Best person for a face across `people` in iteration order. The
/// comparison is strictly greater, so an equal score never displaces an
/// earlier person.
fn best_person_for<'p, S: FaceStore>(
    store: &S,
    face: &Face,
    people: &'p [Person],
) -> anyhow::Result<Option<(&'p Person, f32)>> {
    let mut best: Option<&Person> = None;
    let mut best_score = 0.0_f32;

    for person in people {
        let score = person_score(store, face, person, AUTO_ASSIGN_REPRESENTATIVES)?;
        if score > best_score {
            best_score = score;
            best = Some(person);
        }
    }

    Ok(best.map(|person| (person, best_score)))
}

/// Recompute every listed person's face count from the authoritative
/// links in one pass.
fn refresh_face_counts<S>(store: &S, people: &[Person]) -> anyhow::Result<()>
where
    S: FaceStore + PersonStore,
{
    for person in people {
        let mut person = person.clone();
        person.face_count = store.count_faces_for_person(person.id)?;
        store.save_person(&person)?;
    }
    Ok(())
}

/// Assign an owner's unassigned faces to their best-matching people.
///
/// Matches below [`SIMILARITY_THRESHOLD`] leave the face unassigned, and
/// automatic matches are never marked verified. A failure on one face is
/// logged and skipped so it cannot abort the rest of the pass; the final
/// count refresh covers every person of the owner regardless.
pub fn auto_assign_faces<S>(store: &S, owner_id: i64) -> Result<AutoAssignOutcome>
where
    S: FaceStore + PersonStore,
{
    info!("starting auto-assignment of faces for owner {}", owner_id);

    let unassigned = store.unassigned_faces(owner_id)?;
    let people = store.people_by_face_count(owner_id)?;

    if unassigned.is_empty() || people.is_empty() {
        info!("no unassigned faces or no people for owner {}", owner_id);
        return Ok(AutoAssignOutcome::default());
    }

    let mut outcome = AutoAssignOutcome {
        attempted: unassigned.len(),
        assigned: 0,
    };

    for mut face in unassigned {
        match best_person_for(store, &face, &people) {
            Ok(Some((person, score))) if score >= SIMILARITY_THRESHOLD => {
                face.person_id = Some(person.id);
                face.verified = false; // automatic matches are never self-verifying
                match store.save_face(&face) {
                    Ok(()) => outcome.assigned += 1,
                    Err(e) => warn!("failed to persist auto-assignment of face {}: {e:#}", face.id),
                }
            }
            Ok(_) => {}
            Err(e) => warn!("failed to score face {}: {e:#}", face.id),
        }
    }

    refresh_face_counts(store, &people)?;

    info!(
        "auto-assigned {} of {} faces for owner {}",
        outcome.assigned, outcome.attempted, owner_id
    );
    Ok(outcome)
}

/// Background variant of [`auto_assign_faces`]: reports through an mpsc
/// channel and honors a cooperative cancellation flag between faces.
/// Faces assigned before a cancellation keep their assignment.
pub fn auto_assign_background<S>(
    store: &S,
    owner_id: i64,
    tx: Sender<TaskUpdate>,
    cancel_flag: Arc<AtomicBool>,
) where
    S: FaceStore + PersonStore,
{
    let unassigned = match store.unassigned_faces(owner_id) {
        Ok(faces) => faces,
        Err(e) => {
            let _ = tx.send(TaskUpdate::Failed {
                error: format!("Failed to load unassigned faces: {e:#}"),
            });
            return;
        }
    };
    let people = match store.people_by_face_count(owner_id) {
        Ok(people) => people,
        Err(e) => {
            let _ = tx.send(TaskUpdate::Failed {
                error: format!("Failed to load people: {e:#}"),
            });
            return;
        }
    };

    let total = unassigned.len();
    let _ = tx.send(TaskUpdate::Started { total });

    if total == 0 || people.is_empty() {
        let _ = tx.send(TaskUpdate::Completed {
            message: "No unassigned faces or no people to match".to_string(),
        });
        return;
    }

    let mut assigned = 0usize;

    for (idx, mut face) in unassigned.into_iter().enumerate() {
        if cancel_flag.load(Ordering::SeqCst) {
            let _ = tx.send(TaskUpdate::Cancelled);
            return;
        }

        let _ = tx.send(TaskUpdate::Progress(
            TaskProgress::new(idx, total)
                .with_message(format!("Matching face {}/{}", idx + 1, total)),
        ));

        match best_person_for(store, &face, &people) {
            Ok(Some((person, score))) if score >= SIMILARITY_THRESHOLD => {
                face.person_id = Some(person.id);
                face.verified = false;
                match store.save_face(&face) {
                    Ok(()) => assigned += 1,
                    Err(e) => warn!("failed to persist auto-assignment of face {}: {e:#}", face.id),
                }
            }
            Ok(_) => {}
            Err(e) => warn!("failed to score face {}: {e:#}", face.id),
        }
    }

    if let Err(e) = refresh_face_counts(store, &people) {
        let _ = tx.send(TaskUpdate::Failed {
            error: format!("Failed to refresh face counts: {e:#}"),
        });
        return;
    }

    let _ = tx.send(TaskUpdate::Completed {
        message: format!("Assigned {assigned} of {total} faces"),
    });
}

/// Dispatch an auto-assignment pass to a background thread.
///
/// Returns immediately with the registered task id; the thread opens its
/// own database connection and reports only through the manager's status
/// channel.
pub fn spawn_auto_assign(
    manager: &mut BackgroundTaskManager,
    db_path: PathBuf,
    owner_id: i64,
) -> TaskId {
    let (task_id, tx, cancel_flag) = manager.register("auto-assign");

    std::thread::spawn(move || {
        let db = match Database::open(&db_path) {
            Ok(db) => db,
            Err(e) => {
                let _ = tx.send(TaskUpdate::Failed {
                    error: format!("Failed to open database: {e:#}"),
                });
                return;
            }
        };

        auto_assign_background(&db, owner_id, tx, cancel_flag);
    });

    task_id
}

/// Fold `person2` into `person1` as one atomic unit: every face of
/// person2 is re-pointed to person1, person1 is renamed when `new_name`
/// is non-empty, its face count is recomputed, and person2 is deleted.
/// Both people must belong to the same owner.
pub fn merge_people<S>(
    store: &S,
    person1_id: i64,
    person2_id: i64,
    new_name: Option<&str>,
) -> Result<Person>
where
    S: FaceStore + PersonStore + Atomic,
{
    let mut person1 = store
        .person_by_id(person1_id)?
        .ok_or(Error::PersonNotFound(person1_id))?;
    let person2 = store
        .person_by_id(person2_id)?
        .ok_or(Error::PersonNotFound(person2_id))?;

    if person1.owner_id != person2.owner_id {
        return Err(Error::CrossOwnerMerge);
    }

    let merged = store.atomically(|s| {
        for mut face in s.faces_for_person(person2.id)? {
            face.person_id = Some(person1.id);
            s.save_face(&face)?;
        }

        if let Some(name) = new_name {
            if !name.trim().is_empty() {
                person1.name = name.to_string();
            }
        }
        person1.face_count = s.count_faces_for_person(person1.id)?;
        s.save_person(&person1)?;

        s.delete_person(person2.id)?;
        Ok(person1.clone())
    })?;

    info!("merged person {} into person {}", person2_id, person1_id);
    Ok(merged)
}

/// Ranked identity candidates for a face, best first.
///
/// Candidates must reach `SIMILARITY_THRESHOLD * SUGGESTION_THRESHOLD_FACTOR`;
/// at most [`MAX_SUGGESTIONS`] are returned. The sort is stable, so
/// equal scores keep the person iteration order (largest face count
/// first).
pub fn suggest_people<S>(store: &S, face_id: i64) -> Result<Vec<PersonSuggestion>>
where
    S: FaceStore + PersonStore,
{
    let face = store
        .face_by_id(face_id)?
        .ok_or(Error::FaceNotFound(face_id))?;
    let people = store.people_by_face_count(face.owner_id)?;

    let cutoff = SIMILARITY_THRESHOLD * SUGGESTION_THRESHOLD_FACTOR;
    let mut suggestions = Vec::new();

    for person in &people {
        let score = person_score(store, &face, person, SUGGESTION_REPRESENTATIVES)?;
        if score >= cutoff {
            suggestions.push(PersonSuggestion {
                person_id: person.id,
                person_name: person.name.clone(),
                similarity: score,
                face_count: person.face_count,
            });
        }
    }

    suggestions.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    suggestions.truncate(MAX_SUGGESTIONS);

    Ok(suggestions)
}

/// Remove an identity entirely: its faces return to the unassigned pool
/// and lose their verified status, then the person record is deleted.
pub fn delete_person<S>(store: &S, person_id: i64) -> Result<()>
where
    S: FaceStore + PersonStore + Atomic,
{
    let person = store
        .person_by_id(person_id)?
        .ok_or(Error::PersonNotFound(person_id))?;

    store.atomically(|s| {
        for mut face in s.faces_for_person(person.id)? {
            face.person_id = None;
            face.verified = false;
            s.save_face(&face)?;
        }
        s.delete_person(person.id)?;
        Ok(())
    })?;

    info!("deleted person {}", person_id);
    Ok(())
}
