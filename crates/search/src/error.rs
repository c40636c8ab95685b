use passage_vector_store::{PassageId, VectorStoreError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] VectorStoreError),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Cosine similarity is undefined for a zero-magnitude vector")]
    UndefinedSimilarity,

    #[error("No corpus is loaded")]
    EmptyIndex,

    #[error("Empty query")]
    EmptyQuery,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Passage {0} is missing from the corpus")]
    UnknownPassage(PassageId),
}

impl SearchError {
    /// True for vector length conflicts raised here or by the vector store.
    #[must_use]
    pub const fn is_dimension_mismatch(&self) -> bool {
        match self {
            Self::DimensionMismatch { .. } => true,
            Self::VectorStoreError(err) => err.is_dimension_mismatch(),
            _ => false,
        }
    }
}
