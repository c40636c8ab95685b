use crate::error::{Result, VectorStoreError};

/// Maps text to a fixed-dimension vector.
///
/// Implementations must be deterministic: identical input text has to produce an
/// identical vector, otherwise rankings are not reproducible. Heavy model state
/// belongs to the implementation; callers construct one embedder at startup and
/// share it (usually behind an `Arc<dyn Embedder>`).
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    fn encode(&self, text: &str) -> Result<Vec<f32>>;

    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.encode(text)).collect()
    }
}

/// Deterministic, model-free embedder seeded from a text hash.
///
/// Produces unit-length pseudo-random vectors. Identical text always maps to the
/// same vector, different texts are uncorrelated; useful for tests, smoke runs and
/// corpora whose vectors were computed elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub const DEFAULT_DIMENSION: usize = 384;

    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(VectorStoreError::Embedding(
                "embedding dimension must be > 0".to_string(),
            ));
        }
        Ok(Self { dimension })
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dimension: Self::DEFAULT_DIMENSION,
        }
    }
}

impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_embed(text, self.dimension))
    }
}

/// Checks that an embedder output matches the dimension it advertises.
pub fn ensure_dimension(vector: &[f32], expected: usize) -> Result<()> {
    if vector.len() != expected {
        return Err(VectorStoreError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

fn hash_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
