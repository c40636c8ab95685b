use crate::corpus::Corpus;
use crate::error::{Result, VectorStoreError};
use crate::types::PassageId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const CORPUS_SCHEMA_VERSION: u32 = 1;

/// Where a built corpus (passages plus index) lives between runs.
#[async_trait]
pub trait CorpusStorage: Send + Sync {
    async fn load(&self) -> Result<Corpus>;

    async fn save(&self, corpus: &Corpus) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedCorpus {
    schema_version: u32,
    dimension: usize,
    passages: Vec<PersistedPassage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedPassage {
    id: PassageId,
    text: String,
    vector: Vec<f32>,
}

/// JSON document on disk, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct JsonCorpusStorage {
    path: PathBuf,
}

impl JsonCorpusStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CorpusStorage for JsonCorpusStorage {
    async fn load(&self) -> Result<Corpus> {
        log::info!("Loading corpus from {:?}", self.path);
        let bytes = tokio::fs::read(&self.path).await?;
        let persisted: PersistedCorpus = serde_json::from_slice(&bytes)?;
        let corpus = decode(persisted)?;
        log::info!(
            "Loaded {} passages ({} dimensions)",
            corpus.len(),
            corpus.dimension()
        );
        Ok(corpus)
    }

    async fn save(&self, corpus: &Corpus) -> Result<()> {
        log::info!("Saving corpus to {:?}", self.path);
        // JSON has no NaN/inf, so encode before touching the previous file.
        let bytes = serde_json::to_vec(&encode(corpus)?)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        log::info!("Corpus saved successfully");
        Ok(())
    }
}

/// In-process storage, mostly for tests and embedding callers that build corpora
/// on the fly.
#[derive(Debug, Default)]
pub struct MemoryCorpusStorage {
    slot: Mutex<Option<Corpus>>,
}

impl MemoryCorpusStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CorpusStorage for MemoryCorpusStorage {
    async fn load(&self) -> Result<Corpus> {
        let guard = self
            .slot
            .lock()
            .map_err(|_| VectorStoreError::Index("memory storage lock poisoned".into()))?;
        guard.clone().ok_or(VectorStoreError::EmptyCorpus)
    }

    async fn save(&self, corpus: &Corpus) -> Result<()> {
        let mut guard = self
            .slot
            .lock()
            .map_err(|_| VectorStoreError::Index("memory storage lock poisoned".into()))?;
        *guard = Some(corpus.clone());
        Ok(())
    }
}

fn encode(corpus: &Corpus) -> Result<PersistedCorpus> {
    let passages = corpus
        .passages()
        .iter()
        .zip(corpus.index().to_rows())
        .map(|(passage, vector)| {
            if !vector.iter().all(|component| component.is_finite()) {
                return Err(VectorStoreError::NonFiniteVector {
                    passage: passage.id,
                });
            }
            Ok(PersistedPassage {
                id: passage.id,
                text: passage.text.clone(),
                vector,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(PersistedCorpus {
        schema_version: CORPUS_SCHEMA_VERSION,
        dimension: corpus.dimension(),
        passages,
    })
}

fn decode(persisted: PersistedCorpus) -> Result<Corpus> {
    if persisted.schema_version != CORPUS_SCHEMA_VERSION {
        return Err(VectorStoreError::UnsupportedSchema(persisted.schema_version));
    }

    let mut texts = Vec::with_capacity(persisted.passages.len());
    let mut vectors = Vec::with_capacity(persisted.passages.len());
    for (position, passage) in persisted.passages.into_iter().enumerate() {
        if passage.id.index() != position {
            return Err(VectorStoreError::Index(format!(
                "passage {} stored at position {position}",
                passage.id
            )));
        }
        if passage.vector.len() != persisted.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: persisted.dimension,
                actual: passage.vector.len(),
            });
        }
        texts.push(passage.text);
        vectors.push(passage.vector);
    }

    Corpus::from_parts(texts, vectors)
}
