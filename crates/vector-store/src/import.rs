//! Passage import from JSON Lines.
//!
//! One object per line: `{"text": "...", "vector": [0.1, ...]}`. The vector is
//! optional; passages without one are embedded when the corpus is built.

use crate::error::{Result, VectorStoreError};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

impl CorpusEntry {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            vector: None,
        }
    }

    pub fn with_vector(text: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            vector: Some(vector),
        }
    }
}

/// Parse JSON Lines; blank lines are skipped, line numbers are 1-based.
pub fn parse_jsonl(input: &str) -> Result<Vec<CorpusEntry>> {
    let mut entries = Vec::new();
    for (idx, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let entry: CorpusEntry =
            serde_json::from_str(line).map_err(|err| VectorStoreError::Import {
                line: idx + 1,
                message: err.to_string(),
            })?;
        entries.push(entry);
    }
    Ok(entries)
}

pub async fn read_jsonl(path: impl AsRef<Path>) -> Result<Vec<CorpusEntry>> {
    let path = path.as_ref();
    log::info!("Importing passages from {:?}", path);
    let input = tokio::fs::read_to_string(path).await?;
    let entries = parse_jsonl(&input)?;
    log::info!("Imported {} passages", entries.len());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_entries_with_and_without_vectors() {
        let input = r#"
{"text": "An operating system is a control program.", "vector": [1.0, 0.0]}

{"text": "An operating system is similar to a government."}
"#;
        let entries = parse_jsonl(input).unwrap();
        assert_eq!(
            entries,
            vec![
                CorpusEntry::with_vector("An operating system is a control program.", vec![1.0, 0.0]),
                CorpusEntry::text("An operating system is similar to a government."),
            ]
        );
    }

    #[test]
    fn reports_the_offending_line() {
        let input = "{\"text\": \"ok\"}\n{\"vector\": [1.0]}\n";
        let err = parse_jsonl(input).unwrap_err();
        assert!(matches!(err, VectorStoreError::Import { line: 2, .. }), "{err}");
    }

    #[tokio::test]
    async fn reads_jsonl_from_disk() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("passages.jsonl");
        tokio::fs::write(&path, "{\"text\": \"kernel\"}\n").await.unwrap();

        let entries = read_jsonl(&path).await.unwrap();
        assert_eq!(entries, vec![CorpusEntry::text("kernel")]);
    }
}
