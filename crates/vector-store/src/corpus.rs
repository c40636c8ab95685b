use crate::embedder::{ensure_dimension, Embedder};
use crate::error::{Result, VectorStoreError};
use crate::flat_index::VectorIndex;
use crate::import::CorpusEntry;
use crate::types::{Passage, PassageId};

/// Passages plus the vector index built over them.
///
/// Passage `i` owns row `i` of the index. A corpus is immutable once built;
/// replacing it means building a new one.
#[derive(Debug, Clone)]
pub struct Corpus {
    passages: Vec<Passage>,
    index: VectorIndex,
}

impl Corpus {
    /// Pair texts with precomputed vectors, one vector per text.
    pub fn from_parts(texts: Vec<String>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if texts.len() != vectors.len() {
            return Err(VectorStoreError::PassageCountMismatch {
                passages: texts.len(),
                vectors: vectors.len(),
            });
        }

        let index = VectorIndex::build(&vectors)?;
        let passages = texts
            .into_iter()
            .enumerate()
            .map(|(position, text)| Passage::new(position, text))
            .collect();

        Ok(Self { passages, index })
    }

    /// Embed every text with `embedder` and index the result.
    pub fn embed<E: Embedder + ?Sized>(texts: Vec<String>, embedder: &E) -> Result<Self> {
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let vectors = embedder.encode_batch(&refs)?;
        for vector in &vectors {
            ensure_dimension(vector, embedder.dimension())?;
        }
        Self::from_parts(texts, vectors)
    }

    /// Build from imported entries, embedding only the ones without a vector.
    pub fn from_entries<E: Embedder + ?Sized>(
        entries: Vec<CorpusEntry>,
        embedder: &E,
    ) -> Result<Self> {
        let missing: Vec<&str> = entries
            .iter()
            .filter(|entry| entry.vector.is_none())
            .map(|entry| entry.text.as_str())
            .collect();
        log::info!(
            "Embedding {} of {} passages ({} carry precomputed vectors)",
            missing.len(),
            entries.len(),
            entries.len() - missing.len()
        );

        let mut embedded = embedder.encode_batch(&missing)?.into_iter();
        let mut texts = Vec::with_capacity(entries.len());
        let mut vectors = Vec::with_capacity(entries.len());
        for entry in entries {
            let vector = match entry.vector {
                Some(vector) => vector,
                None => {
                    let vector = embedded.next().ok_or_else(|| {
                        VectorStoreError::Embedding("embedder returned too few vectors".into())
                    })?;
                    ensure_dimension(&vector, embedder.dimension())?;
                    vector
                }
            };
            texts.push(entry.text);
            vectors.push(vector);
        }

        Self::from_parts(texts, vectors)
    }

    #[must_use]
    pub fn passage(&self, id: PassageId) -> Option<&Passage> {
        self.passages.get(id.index())
    }

    #[must_use]
    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    #[must_use]
    pub const fn index(&self) -> &VectorIndex {
        &self.index
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashEmbedder;
    use pretty_assertions::assert_eq;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn from_parts_assigns_positional_ids() {
        let corpus = Corpus::from_parts(
            texts(&["alpha", "beta"]),
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .unwrap();

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.dimension(), 2);
        assert_eq!(corpus.passage(PassageId(1)).map(|p| p.text.as_str()), Some("beta"));
        assert_eq!(corpus.index().vector(PassageId(0)), Some(&[1.0, 0.0][..]));
    }

    #[test]
    fn from_parts_rejects_count_mismatch() {
        let err = Corpus::from_parts(texts(&["alpha"]), vec![vec![1.0], vec![2.0]]).unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::PassageCountMismatch {
                passages: 1,
                vectors: 2
            }
        ));
    }

    #[test]
    fn from_parts_rejects_empty_corpus() {
        let err = Corpus::from_parts(Vec::new(), Vec::new()).unwrap_err();
        assert!(matches!(err, VectorStoreError::EmptyCorpus));
    }

    #[test]
    fn from_entries_embeds_only_missing_vectors() {
        let embedder = HashEmbedder::new(2).unwrap();
        let entries = vec![
            CorpusEntry::with_vector("given", vec![0.5, 0.5]),
            CorpusEntry::text("computed"),
        ];
        let corpus = Corpus::from_entries(entries, &embedder).unwrap();

        assert_eq!(corpus.index().vector(PassageId(0)), Some(&[0.5, 0.5][..]));
        assert_eq!(
            corpus.index().vector(PassageId(1)).map(<[f32]>::to_vec),
            Some(embedder.encode("computed").unwrap())
        );
    }

    #[test]
    fn from_entries_rejects_vectors_in_another_space() {
        let embedder = HashEmbedder::new(4).unwrap();
        let entries = vec![
            CorpusEntry::with_vector("given", vec![0.5, 0.5]),
            CorpusEntry::text("computed"),
        ];
        let err = Corpus::from_entries(entries, &embedder).unwrap_err();
        assert!(err.is_dimension_mismatch());
    }
}
