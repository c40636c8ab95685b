use crate::error::Result;
use crate::scorer::Scorer;
use passage_vector_store::PassageId;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub id: PassageId,
    pub score: f32,
}

/// Bounded top-k selection over a candidate pool.
///
/// Every candidate is scored exactly once against the query; the best `k` are
/// kept in a bounded heap. There is no successor expansion or path cost: this is
/// a priority-queue extraction, not a graph search.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reranker {
    scorer: Scorer,
}

impl Reranker {
    #[must_use]
    pub const fn new(scorer: Scorer) -> Self {
        Self { scorer }
    }

    #[must_use]
    pub const fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    /// Top `k` candidates by descending relevance, ties in input order.
    ///
    /// Scoring failures abort the whole selection; no partial ranking is
    /// returned.
    pub fn rank(
        &self,
        query: &[f32],
        candidates: &[(PassageId, &[f32])],
        k: usize,
    ) -> Result<Vec<ScoredCandidate>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut heap = BinaryHeap::with_capacity(k.min(candidates.len()) + 1);
        for (position, (id, vector)) in candidates.iter().enumerate() {
            let score = self.scorer.relevance(query, vector)?;
            heap.push(HeapEntry {
                score,
                position,
                id: *id,
            });
            if heap.len() > k {
                heap.pop();
            }
        }

        let ranked: Vec<ScoredCandidate> = heap
            .into_sorted_vec()
            .into_iter()
            .map(|entry| ScoredCandidate {
                id: entry.id,
                score: entry.score,
            })
            .collect();
        log::debug!(
            "Reranked {} candidates with {} formula, kept {}",
            candidates.len(),
            self.scorer.formula(),
            ranked.len()
        );
        Ok(ranked)
    }

    pub fn select(
        &self,
        query: &[f32],
        candidates: &[(PassageId, &[f32])],
        k: usize,
    ) -> Result<Vec<PassageId>> {
        Ok(self
            .rank(query, candidates, k)?
            .into_iter()
            .map(|candidate| candidate.id)
            .collect())
    }
}

// Ordered so that the heap maximum is the weakest entry: lowest score first,
// then the latest input position.
struct HeapEntry {
    score: f32,
    position: usize,
    id: PassageId,
}

fn score_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        score_key(other.score)
            .total_cmp(&score_key(self.score))
            .then_with(|| self.position.cmp(&other.position))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use crate::scorer::{ScoringFormula, REFERENCE_FORMULA};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn pool(vectors: &[Vec<f32>]) -> Vec<(PassageId, &[f32])> {
        vectors
            .iter()
            .enumerate()
            .map(|(idx, vector)| (PassageId(idx * 10), vector.as_slice()))
            .collect()
    }

    fn similarity_reranker() -> Reranker {
        Reranker::new(Scorer::new(ScoringFormula::Similarity))
    }

    #[test]
    fn ranks_by_descending_similarity() {
        let vectors = vec![vec![0.0, 1.0], vec![0.7, 0.7], vec![1.0, 0.0]];
        let ranked = similarity_reranker()
            .select(&[1.0, 0.0], &pool(&vectors), 3)
            .unwrap();
        assert_eq!(ranked, vec![PassageId(20), PassageId(10), PassageId(0)]);
    }

    #[test]
    fn truncates_to_k() {
        let vectors = vec![vec![0.0, 1.0], vec![0.7, 0.7], vec![1.0, 0.0]];
        let ranked = similarity_reranker()
            .select(&[1.0, 0.0], &pool(&vectors), 1)
            .unwrap();
        assert_eq!(ranked, vec![PassageId(20)]);
    }

    #[test]
    fn reference_formula_keeps_input_order() {
        let vectors = vec![
            vec![0.0, 1.0],
            vec![0.7, 0.7],
            vec![1.0, 0.0],
            vec![0.2, 0.9],
        ];
        let reranker = Reranker::new(Scorer::new(REFERENCE_FORMULA));
        let ranked = reranker.rank(&[1.0, 0.0], &pool(&vectors), 4).unwrap();

        assert!(ranked.iter().all(|c| c.score == 1.0));
        assert_eq!(
            ranked.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![PassageId(0), PassageId(10), PassageId(20), PassageId(30)]
        );

        let top2 = reranker.select(&[1.0, 0.0], &pool(&vectors), 2).unwrap();
        assert_eq!(top2, vec![PassageId(0), PassageId(10)]);
    }

    #[test]
    fn reference_formula_keeps_order_for_opposing_candidates() {
        let vectors = vec![vec![-0.009, 1.0], vec![0.0, 1.0], vec![-1.0, 0.2]];
        let reranker = Reranker::new(Scorer::new(REFERENCE_FORMULA));
        let ranked = reranker.rank(&[1.0, 0.0], &pool(&vectors), 3).unwrap();

        assert!(ranked.iter().all(|c| c.score == 1.0));
        assert_eq!(
            ranked.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![PassageId(0), PassageId(10), PassageId(20)]
        );
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let vectors = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![2.0, 0.0], vec![3.0, 0.0]];
        let ranked = similarity_reranker()
            .select(&[1.0, 0.0], &pool(&vectors), 2)
            .unwrap();
        assert_eq!(ranked, vec![PassageId(10), PassageId(20)]);
    }

    #[test]
    fn empty_pool_yields_nothing() {
        for k in [0, 1, 3, 100] {
            assert!(similarity_reranker().select(&[1.0], &[], k).unwrap().is_empty());
        }
    }

    #[test]
    fn zero_k_yields_nothing() {
        let vectors = vec![vec![1.0, 0.0]];
        assert!(similarity_reranker()
            .select(&[1.0, 0.0], &pool(&vectors), 0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn scoring_errors_abort_selection() {
        let vectors = vec![vec![1.0, 0.0], vec![1.0]];
        let err = similarity_reranker()
            .select(&[1.0, 0.0], &pool(&vectors), 2)
            .unwrap_err();
        assert!(err.is_dimension_mismatch());

        let vectors = vec![vec![1.0, 0.0], vec![0.0, 0.0]];
        let err = similarity_reranker()
            .select(&[1.0, 0.0], &pool(&vectors), 1)
            .unwrap_err();
        assert!(matches!(err, SearchError::UndefinedSimilarity));
    }

    proptest! {
        #[test]
        fn proptest_scores_are_non_increasing(
            vectors in prop::collection::vec(prop::collection::vec(0.1f32..5.0, 3), 0..30),
            k in 0usize..40,
            formula in prop::sample::select(ScoringFormula::ALL.to_vec()),
        ) {
            let reranker = Reranker::new(Scorer::new(formula));
            let ranked = reranker.rank(&[1.0, 0.5, 0.25], &pool(&vectors), k).unwrap();
            prop_assert_eq!(ranked.len(), k.min(vectors.len()));
            for pair in ranked.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
        }

        #[test]
        fn proptest_large_k_returns_every_candidate(
            vectors in prop::collection::vec(prop::collection::vec(0.1f32..5.0, 2), 1..30),
            extra in 0usize..10,
        ) {
            let candidates = pool(&vectors);
            let ranked = similarity_reranker()
                .select(&[0.3, 0.7], &candidates, vectors.len() + extra)
                .unwrap();
            let mut got = ranked;
            got.sort();
            let mut expected: Vec<PassageId> = candidates.iter().map(|(id, _)| *id).collect();
            expected.sort();
            prop_assert_eq!(got, expected);
        }

        #[test]
        fn proptest_reference_formula_preserves_input_order(
            query in prop::collection::vec(-5.0f32..5.0, 4),
            vectors in prop::collection::vec(prop::collection::vec(-5.0f32..5.0, 4), 1..30),
            k in 1usize..40,
        ) {
            prop_assume!(query.iter().any(|v| *v != 0.0));
            prop_assume!(vectors.iter().all(|v| v.iter().any(|x| *x != 0.0)));
            let candidates = pool(&vectors);
            let ranked = Reranker::new(Scorer::new(REFERENCE_FORMULA))
                .select(&query, &candidates, k)
                .unwrap();
            let expected: Vec<PassageId> = candidates
                .iter()
                .take(k)
                .map(|(id, _)| *id)
                .collect();
            prop_assert_eq!(ranked, expected);
        }
    }
}
