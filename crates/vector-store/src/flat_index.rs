use crate::error::{Result, VectorStoreError};
use crate::types::{Candidate, PassageId};
use ndarray::{Array2, ArrayView1, Axis};
use std::cmp::Ordering;

/// Exact nearest-neighbour index over raw vectors.
///
/// Rows are stored in passage order, so row `i` holds the vector of
/// `PassageId(i)`. Distances are squared Euclidean (L2) over the un-normalized
/// vectors, matching a flat L2 index: queries must live in the same space as the
/// corpus vectors.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    vectors: Array2<f32>,
}

impl VectorIndex {
    /// Build the index from every corpus vector, in passage order.
    pub fn build(vectors: &[Vec<f32>]) -> Result<Self> {
        let Some(first) = vectors.first() else {
            return Err(VectorStoreError::EmptyCorpus);
        };
        let dimension = first.len();

        let mut data = Vec::with_capacity(vectors.len() * dimension);
        for vector in vectors {
            if vector.len() != dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            data.extend_from_slice(vector);
        }

        let vectors = Array2::from_shape_vec((vectors.len(), dimension), data)
            .map_err(|err| VectorStoreError::Index(err.to_string()))?;
        log::debug!(
            "Built flat L2 index: {} vectors, {} dimensions",
            vectors.nrows(),
            vectors.ncols()
        );
        Ok(Self { vectors })
    }

    /// Up to `pool_size` nearest vectors, nearest first.
    ///
    /// Equal distances keep scan order (ascending passage id). A pool larger than
    /// the corpus returns the whole corpus.
    pub fn search(&self, query: &[f32], pool_size: usize) -> Result<Vec<Candidate>> {
        self.check_dimension(query.len())?;
        if pool_size == 0 {
            return Ok(Vec::new());
        }

        let query = ArrayView1::from(query);
        let mut candidates: Vec<Candidate> = self
            .vectors
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(row, vector)| Candidate {
                id: PassageId(row),
                distance: squared_l2(query, vector),
            })
            .collect();

        let pool = pool_size.min(candidates.len());
        if pool < candidates.len() {
            candidates.select_nth_unstable_by(pool - 1, compare_candidates);
            candidates.truncate(pool);
        }
        candidates.sort_unstable_by(compare_candidates);

        log::debug!(
            "Flat L2 search: pool_size={pool_size}, returned {}",
            candidates.len()
        );
        Ok(candidates)
    }

    /// Stored vector of a passage.
    #[must_use]
    pub fn vector(&self, id: PassageId) -> Option<&[f32]> {
        if id.index() >= self.len() {
            return None;
        }
        let dimension = self.dimension();
        let start = id.index() * dimension;
        self.vectors.as_slice()?.get(start..start + dimension)
    }

    /// Every stored vector, in passage order.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.vectors
            .axis_iter(Axis(0))
            .map(|row| row.to_vec())
            .collect()
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.nrows()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.nrows() == 0
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        if actual != self.dimension() {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension(),
                actual,
            });
        }
        Ok(())
    }
}

fn squared_l2(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

// NaN distances (non-finite inputs) sort after every real distance.
fn distance_key(distance: f32) -> f32 {
    if distance.is_nan() {
        f32::INFINITY
    } else {
        distance
    }
}

fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    distance_key(a.distance)
        .total_cmp(&distance_key(b.distance))
        .then_with(|| a.id.cmp(&b.id))
}
