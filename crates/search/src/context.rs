use crate::error::Result;
use passage_vector_store::Passage;

/// Downstream user of retrieved passages, typically a text generator.
pub trait ContextConsumer {
    fn consume(&self, query: &str, passages: &[Passage]) -> Result<String>;
}

/// Renders retrieved passages into a generation prompt.
#[derive(Debug, Clone)]
pub struct PromptContext {
    separator: String,
}

impl Default for PromptContext {
    fn default() -> Self {
        Self {
            separator: ". ".to_string(),
        }
    }
}

impl PromptContext {
    #[must_use]
    pub fn with_separator(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    /// Passage texts joined in ranked order.
    #[must_use]
    pub fn content(&self, passages: &[Passage]) -> String {
        passages
            .iter()
            .map(|passage| passage.text.as_str())
            .collect::<Vec<_>>()
            .join(&self.separator)
    }
}

impl ContextConsumer for PromptContext {
    fn consume(&self, query: &str, passages: &[Passage]) -> Result<String> {
        Ok(format!(
            "Query: '{query}'\nDetails retrieved:\n{}\n\nBased on the above, provide a cohesive and clear explanation:",
            self.content(passages)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passage_vector_store::PassageId;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_prompt_in_ranked_order() {
        let passages = vec![
            Passage::new(PassageId(2), "An operating system is a control program"),
            Passage::new(PassageId(0), "An operating system is similar to a government"),
        ];
        let prompt = PromptContext::default()
            .consume("What is an operating system?", &passages)
            .unwrap();
        assert_eq!(
            prompt,
            "Query: 'What is an operating system?'\n\
             Details retrieved:\n\
             An operating system is a control program. An operating system is similar to a government\n\n\
             Based on the above, provide a cohesive and clear explanation:"
        );
    }

    #[test]
    fn empty_passages_render_empty_content() {
        assert_eq!(PromptContext::with_separator("\n").content(&[]), "");
    }
}
