use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How `g` (cosine similarity) and `h = 1 - g` combine into a relevance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringFormula {
    /// `g + h`, the historical scorer. It always evaluates to 1, so re-ranking keeps
    /// the candidate pool order.
    #[default]
    Reference,
    /// `g` alone.
    Similarity,
    /// `g - h`, i.e. `2g - 1`. Same order as `Similarity`, scores in [-1, 1].
    SimilarityMinusHeuristic,
}

/// The formula the scorer uses unless configured otherwise.
pub const REFERENCE_FORMULA: ScoringFormula = ScoringFormula::Reference;

impl ScoringFormula {
    pub const ALL: [Self; 3] = [
        Self::Reference,
        Self::Similarity,
        Self::SimilarityMinusHeuristic,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Similarity => "similarity",
            Self::SimilarityMinusHeuristic => "similarity-minus-heuristic",
        }
    }
}

impl fmt::Display for ScoringFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoringFormula {
    type Err = SearchError;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|formula| formula.as_str() == normalized)
            .ok_or_else(|| {
                SearchError::InvalidConfig(format!(
                    "unknown scoring formula '{raw}' (expected reference, similarity or similarity-minus-heuristic)"
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scorer {
    formula: ScoringFormula,
}

impl Scorer {
    #[must_use]
    pub const fn new(formula: ScoringFormula) -> Self {
        Self { formula }
    }

    #[must_use]
    pub const fn formula(&self) -> ScoringFormula {
        self.formula
    }

    /// Cosine similarity, clamped to [-1, 1].
    ///
    /// Zero-magnitude input is an error rather than a sentinel score: a zero
    /// vector in the corpus or from the embedder is a data problem the caller has
    /// to see. Both vectors are scaled by their largest component first, so tiny
    /// but non-zero vectors do not underflow to a zero norm.
    pub fn similarity(a: &[f32], b: &[f32]) -> Result<f32> {
        if a.len() != b.len() {
            return Err(SearchError::DimensionMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }

        let scale_a = max_magnitude(a);
        let scale_b = max_magnitude(b);
        if scale_a == 0.0 || scale_b == 0.0 {
            return Err(SearchError::UndefinedSimilarity);
        }

        let mut dot_product = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;
        for (x, y) in a.iter().zip(b.iter()) {
            let (x, y) = (x / scale_a, y / scale_b);
            dot_product += x * y;
            norm_a += x * x;
            norm_b += y * y;
        }

        Ok((dot_product / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0))
    }

    pub fn relevance(&self, query: &[f32], candidate: &[f32]) -> Result<f32> {
        // f64 keeps `g + (1 - g)` exact for every f32 similarity.
        let g = f64::from(Self::similarity(query, candidate)?);
        let h = 1.0 - g;
        let score = match self.formula {
            ScoringFormula::Reference => g + h,
            ScoringFormula::Similarity => g,
            ScoringFormula::SimilarityMinusHeuristic => g - h,
        };
        Ok(score as f32)
    }
}

fn max_magnitude(v: &[f32]) -> f32 {
    v.iter().fold(0.0f32, |max, x| max.max(x.abs()))
}
