//! Face similarity clustering and identity assignment for photo
//! libraries.
//!
//! Faces arrive from an external detector as bounding boxes with
//! embedding vectors. This crate decides which faces belong to the same
//! person, which identity a new face should join, how two identities
//! merge, and how to rank identity suggestions for a reviewer. Storage
//! is SQLite behind the capability traits in [`store`], so the engine
//! stays independent of the backend.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod logging;
pub mod store;
pub mod tasks;

pub use config::Config;
pub use db::{BoundingBox, Database, Face, Person};
pub use engine::{
    assign_face, auto_assign_faces, cluster_unassigned, cosine_similarity, delete_person,
    merge_people, suggest_people, unassign_face, AutoAssignOutcome, FaceCluster, PersonSuggestion,
    SIMILARITY_THRESHOLD,
};
pub use error::{Error, Result};
pub use store::{Atomic, FaceStore, PersonStore};
