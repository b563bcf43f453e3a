//! The matching engine: embedding similarity, clustering of unassigned
//! faces, and identity assignment.

pub mod assignment;
pub mod clustering;
pub mod similarity;

pub use assignment::{
    assign_face, auto_assign_faces, delete_person, merge_people, suggest_people, unassign_face,
    AutoAssignOutcome, PersonSuggestion,
};
pub use clustering::{cluster_unassigned, FaceCluster};
pub use similarity::{cosine_similarity, face_similarity};

/// Minimum cosine similarity for two faces to count as the same person,
/// both when clustering and when auto-assigning.
pub const SIMILARITY_THRESHOLD: f32 = 0.6;

/// Suggestions use a lower bar:
/// `SIMILARITY_THRESHOLD * SUGGESTION_THRESHOLD_FACTOR`.
pub const SUGGESTION_THRESHOLD_FACTOR: f32 = 0.7;

/// How many of a person's faces stand in for the identity during
/// auto-assignment.
pub(crate) const AUTO_ASSIGN_REPRESENTATIVES: usize = 5;

/// Representative faces per person when ranking suggestions.
pub(crate) const SUGGESTION_REPRESENTATIVES: usize = 3;

/// Upper bound on returned suggestions.
pub(crate) const MAX_SUGGESTIONS: usize = 5;
