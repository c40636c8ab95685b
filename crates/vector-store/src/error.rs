use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Cannot build an index from an empty corpus")]
    EmptyCorpus,

    #[error("Passage count ({passages}) doesn't match vector count ({vectors})")]
    PassageCountMismatch { passages: usize, vectors: usize },

    #[error("Index error: {0}")]
    Index(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Import error at line {line}: {message}")]
    Import { line: usize, message: String },

    #[error("Passage {passage} has a non-finite vector component")]
    NonFiniteVector { passage: crate::types::PassageId },

    #[error("Unsupported corpus schema_version {0} (expected {})", crate::storage::CORPUS_SCHEMA_VERSION)]
    UnsupportedSchema(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VectorStoreError {
    /// True when the error signals a corpus/embedder dimensionality conflict.
    #[must_use]
    pub const fn is_dimension_mismatch(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. })
    }
}
