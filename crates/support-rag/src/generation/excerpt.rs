//! Deterministic document-only answers

use crate::types::QueryResult;

/// First `max_chars` characters of `text`, and whether anything was cut
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}

/// Format retrieved chunks as numbered excerpts
///
/// ```text
/// Found 2 relevant excerpt(s):
///
/// Result 1 (from faq.pdf):
/// <up to excerpt_chars characters>...
/// ```
pub fn format_excerpts(results: &[QueryResult], excerpt_chars: usize) -> String {
    let mut parts = vec![format!("Found {} relevant excerpt(s):", results.len())];

    for (i, result) in results.iter().enumerate() {
        let (text, cut) = truncate_chars(result.text.trim(), excerpt_chars);
        let ellipsis = if cut { "..." } else { "" };
        parts.push(format!(
            "Result {} (from {}):\n{}{}",
            i + 1,
            result.source_document_name,
            text,
            ellipsis
        ));
    }

    parts.join("\n\n")
}

/// Canned reply when nothing was retrieved
pub fn no_results_message(question: &str) -> String {
    format!(
        "No relevant documents found for: '{}'. Try rephrasing your question or asking about a different topic.",
        question
    )
}
