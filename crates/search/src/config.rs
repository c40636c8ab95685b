use crate::error::SearchError;
use crate::scorer::ScoringFormula;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_POOL_SIZE: usize = 10;
pub const DEFAULT_TOP_K: usize = 3;

/// Retrieval knobs, loadable from JSON or TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Nearest neighbours fetched before re-ranking
    pub pool_size: usize,

    /// Passages returned after re-ranking
    pub top_k: usize,

    /// Relevance formula used by the re-ranker
    pub formula: ScoringFormula,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            top_k: DEFAULT_TOP_K,
            formula: ScoringFormula::default(),
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> std::result::Result<(), SearchError> {
        validate_sizes(self.pool_size, self.top_k)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read retrieval config {}", path.display()))?;
        Self::from_bytes(&bytes)
            .with_context(|| format!("Retrieval config {} is not valid", path.display()))
    }

    /// Parse JSON, falling back to TOML.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let config: Self = match serde_json::from_slice(bytes) {
            Ok(config) => config,
            Err(json_err) => {
                let utf8 =
                    std::str::from_utf8(bytes).map_err(|err| anyhow!("{json_err}; {err}"))?;
                toml::from_str(utf8).map_err(|toml_err| {
                    anyhow!(
                        "Config is not valid JSON or TOML ({json_err}); TOML parse error: {toml_err}"
                    )
                })?
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line style overrides on top of this config.
    #[must_use]
    pub fn with_overrides(
        mut self,
        pool_size: Option<usize>,
        top_k: Option<usize>,
        formula: Option<ScoringFormula>,
    ) -> Self {
        if let Some(pool_size) = pool_size {
            self.pool_size = pool_size;
        }
        if let Some(top_k) = top_k {
            self.top_k = top_k;
        }
        if let Some(formula) = formula {
            self.formula = formula;
        }
        self
    }
}

pub(crate) fn validate_sizes(pool_size: usize, top_k: usize) -> std::result::Result<(), SearchError> {
    if pool_size == 0 {
        return Err(SearchError::InvalidConfig("pool_size must be > 0".to_string()));
    }
    if top_k == 0 {
        return Err(SearchError::InvalidConfig("top_k must be > 0".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_valid() {
        let config = RetrievalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.formula, ScoringFormula::Reference);
    }

    #[test]
    fn test_parses_json_and_toml() {
        let json = RetrievalConfig::from_bytes(br#"{"top_k": 5, "formula": "similarity"}"#).unwrap();
        assert_eq!(
            json,
            RetrievalConfig {
                pool_size: 10,
                top_k: 5,
                formula: ScoringFormula::Similarity,
            }
        );

        let toml = RetrievalConfig::from_bytes(
            b"pool_size = 25\nformula = \"similarity-minus-heuristic\"\n",
        )
        .unwrap();
        assert_eq!(toml.pool_size, 25);
        assert_eq!(toml.top_k, 3);
        assert_eq!(toml.formula, ScoringFormula::SimilarityMinusHeuristic);
    }

    #[test]
    fn test_rejects_unknown_keys_and_zero_sizes() {
        assert!(RetrievalConfig::from_bytes(br#"{"poolsize": 4}"#).is_err());
        assert!(RetrievalConfig::from_bytes(b"top_k = 0").is_err());
        assert!(RetrievalConfig::from_bytes(b"pool_size = 0").is_err());
        assert!(RetrievalConfig::from_bytes(b"formula = \"astar\"").is_err());
    }

    #[test]
    fn test_overrides() {
        let config = RetrievalConfig::default().with_overrides(Some(4), None, Some(ScoringFormula::Similarity));
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.formula, ScoringFormula::Similarity);
    }

    #[test]
    fn test_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("retrieval.toml");
        std::fs::write(&path, "top_k = 1\n").unwrap();
        assert_eq!(RetrievalConfig::from_file(&path).unwrap().top_k, 1);
        assert!(RetrievalConfig::from_file(&tmp.path().join("missing.toml")).is_err());
    }
}
