//! Prompt templates for grounded answer generation

use crate::types::QueryResult;

use super::excerpt::truncate_chars;

/// Prompt builder for support questions
pub struct PromptBuilder;

impl PromptBuilder {
    /// Concatenate retrieved chunk texts, each cut to `chars_per_chunk` characters
    pub fn build_context(results: &[QueryResult], chars_per_chunk: usize) -> String {
        results
            .iter()
            .map(|r| {
                let (text, _) = truncate_chars(&r.text, chars_per_chunk);
                format!("[Source: {}]\n{}", r.source_document_name, text)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the full prompt sent to the model
    pub fn build_answer_prompt(question: &str, context: &str) -> String {
        format!(
            r#"You are a customer support assistant. Answer the user's question using the support documents below.

RULES:
1. Use only information stated in the context
2. If the context does not contain the answer, say so plainly
3. Keep the answer short and practical
4. Mention the source file when you quote a specific policy

CONTEXT FROM SUPPORT DOCUMENTS:
{context}

QUESTION: {question}

Answer based on the context provided:"#,
            context = context,
            question = question,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(source: &str, text: &str) -> QueryResult {
        QueryResult {
            chunk_id: format!("{}-0", source),
            source_document_name: source.to_string(),
            text: text.to_string(),
            distance: 0.1,
        }
    }

    #[test]
    fn test_context_keeps_order_and_truncates() {
        let results = vec![result("a.txt", "first chunk"), result("b.txt", &"x".repeat(50))];
        let context = PromptBuilder::build_context(&results, 10);
        assert!(context.starts_with("[Source: a.txt]\nfirst chun"));
        assert!(context.contains("[Source: b.txt]\nxxxxxxxxxx"));
        assert!(!context.contains(&"x".repeat(11)));
    }

    #[test]
    fn test_prompt_contains_question_and_context() {
        let prompt = PromptBuilder::build_answer_prompt("What is the refund window?", "CTX");
        assert!(prompt.contains("QUESTION: What is the refund window?"));
        assert!(prompt.contains("CTX"));
    }
}
