use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by assignment and clustering operations.
///
/// Degenerate embeddings are never an error anywhere in the engine; they
/// score 0.0 and simply fail to match.
#[derive(Debug, Error)]
pub enum Error {
    #[error("face {0} not found")]
    FaceNotFound(i64),

    #[error("person {0} not found")]
    PersonNotFound(i64),

    #[error("cannot merge people belonging to different owners")]
    CrossOwnerMerge,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
