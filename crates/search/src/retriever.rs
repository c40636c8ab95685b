use crate::config::{validate_sizes, RetrievalConfig};
use crate::error::{Result, SearchError};
use crate::rerank::Reranker;
use crate::scorer::Scorer;
use arc_swap::ArcSwapOption;
use passage_vector_store::{Corpus, CorpusStorage, Embedder, Passage, PassageId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// A passage returned by the retriever, with the scores that placed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedPassage {
    pub passage: Passage,
    /// Relevance score from the re-ranker
    pub score: f32,
    /// Squared L2 distance from the candidate search
    pub distance: f32,
}

/// Two-stage retrieval: flat L2 candidate pool, then bounded re-ranking.
///
/// The embedder is injected once and shared across calls. The served corpus sits
/// in an atomically swappable slot: `install` publishes a fully built corpus and
/// in-flight calls keep the snapshot they started with.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    config: RetrievalConfig,
    reranker: Reranker,
    corpus: ArcSwapOption<Corpus>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, config: RetrievalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            embedder,
            config,
            reranker: Reranker::new(Scorer::new(config.formula)),
            corpus: ArcSwapOption::empty(),
        })
    }

    pub fn with_corpus(
        embedder: Arc<dyn Embedder>,
        config: RetrievalConfig,
        corpus: Corpus,
    ) -> Result<Self> {
        let retriever = Self::new(embedder, config)?;
        retriever.install(corpus);
        Ok(retriever)
    }

    #[must_use]
    pub const fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    #[must_use]
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Snapshot of the corpus currently served.
    #[must_use]
    pub fn corpus(&self) -> Option<Arc<Corpus>> {
        self.corpus.load_full()
    }

    /// Publish a new corpus, returning the one it replaces.
    pub fn install(&self, corpus: Corpus) -> Option<Arc<Corpus>> {
        if corpus.dimension() != self.embedder.dimension() {
            log::warn!(
                "Installed corpus has {} dimensions but the embedder produces {}; text queries will fail",
                corpus.dimension(),
                self.embedder.dimension()
            );
        }
        log::info!("Serving corpus of {} passages", corpus.len());
        self.corpus.swap(Some(Arc::new(corpus)))
    }

    /// Stop serving any corpus.
    pub fn clear(&self) -> Option<Arc<Corpus>> {
        self.corpus.swap(None)
    }

    /// Load a corpus from `storage` and install it once fully built.
    pub async fn reload_from(&self, storage: &dyn CorpusStorage) -> Result<()> {
        let corpus = storage.load().await?;
        self.install(corpus);
        Ok(())
    }

    /// Retrieve with the configured pool size and top-k.
    pub fn retrieve(&self, query_text: &str) -> Result<Vec<Passage>> {
        self.retrieve_with(query_text, self.config.pool_size, self.config.top_k)
    }

    pub fn retrieve_with(
        &self,
        query_text: &str,
        pool_size: usize,
        top_k: usize,
    ) -> Result<Vec<Passage>> {
        Ok(self
            .search(query_text, pool_size, top_k)?
            .into_iter()
            .map(|retrieved| retrieved.passage)
            .collect())
    }

    /// Embed `query_text` and return the ranked passages with their scores.
    pub fn search(
        &self,
        query_text: &str,
        pool_size: usize,
        top_k: usize,
    ) -> Result<Vec<RetrievedPassage>> {
        validate_sizes(pool_size, top_k)?;
        let corpus = self.loaded()?;
        if query_text.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        log::debug!("Retrieving: '{query_text}' (pool_size: {pool_size}, top_k: {top_k})");
        let query = self.embedder.encode(query_text)?;
        rank_in(&corpus, &self.reranker, &query, pool_size, top_k)
    }

    /// Same as [`Retriever::search`] for a query that is already embedded.
    pub fn search_vector(
        &self,
        query: &[f32],
        pool_size: usize,
        top_k: usize,
    ) -> Result<Vec<RetrievedPassage>> {
        validate_sizes(pool_size, top_k)?;
        let corpus = self.loaded()?;
        rank_in(&corpus, &self.reranker, query, pool_size, top_k)
    }

    fn loaded(&self) -> Result<Arc<Corpus>> {
        self.corpus.load_full().ok_or(SearchError::EmptyIndex)
    }
}

fn rank_in(
    corpus: &Corpus,
    reranker: &Reranker,
    query: &[f32],
    pool_size: usize,
    top_k: usize,
) -> Result<Vec<RetrievedPassage>> {
    let candidates = corpus.index().search(query, pool_size)?;
    log::debug!("Candidate pool: {} passages", candidates.len());

    let mut distances = HashMap::with_capacity(candidates.len());
    let mut pool: Vec<(PassageId, &[f32])> = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        let vector = corpus
            .index()
            .vector(candidate.id)
            .ok_or(SearchError::UnknownPassage(candidate.id))?;
        distances.insert(candidate.id, candidate.distance);
        pool.push((candidate.id, vector));
    }

    let ranked = reranker.rank(query, &pool, top_k)?;
    ranked
        .into_iter()
        .map(|scored| {
            let passage = corpus
                .passage(scored.id)
                .ok_or(SearchError::UnknownPassage(scored.id))?;
            Ok(RetrievedPassage {
                passage: passage.clone(),
                score: scored.score,
                distance: distances.get(&scored.id).copied().unwrap_or(f32::NAN),
            })
        })
        .collect()
}
