//! # Passage Vector Store
//!
//! Dense vector storage and exact nearest-neighbour search over corpus passages.
//!
//! ## Features
//!
//! - **Flat L2 search** over raw (un-normalized) vectors, nearest first
//! - **Pluggable embedders** behind the [`Embedder`] trait, plus a deterministic
//!   model-free [`HashEmbedder`]
//! - **Persistent storage** behind [`CorpusStorage`], with a JSON implementation
//! - **JSON Lines import** for passages with or without precomputed vectors
//!
//! ## Architecture
//!
//! ```text
//! CorpusEntry[] (text, optional vector)
//!     │
//!     ├──> Embedder (missing vectors only)
//!     │      └─> Vec<f32>[dimension]
//!     │
//!     ├──> Corpus
//!     │      ├─> Passage[] (id = position)
//!     │      └─> VectorIndex (row i = passage i)
//!     │
//!     └──> CorpusStorage
//!            └─> JSON document
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use passage_vector_store::{Corpus, CorpusStorage, HashEmbedder, JsonCorpusStorage};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let embedder = HashEmbedder::new(64)?;
//!     let texts = vec!["An operating system is a control program.".to_string()];
//!     let corpus = Corpus::embed(texts, &embedder)?;
//!
//!     JsonCorpusStorage::new("corpus.json").save(&corpus).await?;
//!
//!     for candidate in corpus.index().search(&corpus.index().to_rows()[0], 10)? {
//!         println!("{}: {:.3}", candidate.id, candidate.distance);
//!     }
//!     Ok(())
//! }
//! ```

mod corpus;
mod embedder;
mod error;
mod flat_index;
mod import;
mod storage;
mod types;

pub use corpus::Corpus;
pub use embedder::{ensure_dimension, Embedder, HashEmbedder};
pub use error::{Result, VectorStoreError};
pub use flat_index::VectorIndex;
pub use import::{parse_jsonl, read_jsonl, CorpusEntry};
pub use storage::{CorpusStorage, JsonCorpusStorage, MemoryCorpusStorage, CORPUS_SCHEMA_VERSION};
pub use types::{Candidate, Passage, PassageId};
