//! # Passage Search
//!
//! Two-stage passage retrieval on top of `passage-vector-store`:
//!
//! ```text
//! query text
//!     │
//!     ├──> Embedder ──> query vector
//!     │
//!     ├──> VectorIndex::search (flat L2, pool_size nearest)
//!     │
//!     ├──> Reranker (relevance per candidate, bounded top-k)
//!     │
//!     └──> Passage[] in ranked order ──> ContextConsumer
//! ```

mod config;
mod context;
mod error;
mod rerank;
mod retriever;
mod scorer;

pub use config::{RetrievalConfig, DEFAULT_POOL_SIZE, DEFAULT_TOP_K};
pub use context::{ContextConsumer, PromptContext};
pub use error::{Result, SearchError};
pub use rerank::{Reranker, ScoredCandidate};
pub use retriever::{RetrievedPassage, Retriever};
pub use scorer::{Scorer, ScoringFormula, REFERENCE_FORMULA};
