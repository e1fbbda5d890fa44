//! Sentence-aware text chunking with overlap

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;

/// Text chunker with configurable size and overlap
///
/// Sizes are counted in characters. Every emitted chunk is at most
/// `chunk_size` characters long; consecutive chunks share up to `overlap`
/// characters of trailing context.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks
    overlap: usize,
    /// Minimum chunk size
    min_size: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
            min_size: 1,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap).with_min_size(config.min_chunk_size)
    }

    /// Drop chunks shorter than `min_size` characters
    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size.max(1);
        self
    }

    /// Split text into chunks
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for piece in self.pieces(text) {
            let piece_len = piece.chars().count();

            if current_len > 0 && current_len + piece_len > self.chunk_size {
                self.emit(&mut chunks, &current);

                // Carry the tail of the previous chunk, leaving room for the piece
                let budget = self.overlap.min(self.chunk_size.saturating_sub(piece_len));
                current = overlap_tail(&current, budget).to_string();
                current_len = current.chars().count();
            }

            current.push_str(piece);
            current_len += piece_len;
        }

        self.emit(&mut chunks, &current);
        chunks
    }

    fn emit(&self, chunks: &mut Vec<String>, text: &str) {
        let trimmed = text.trim();
        if trimmed.chars().count() >= self.min_size {
            chunks.push(trimmed.to_string());
        }
    }

    /// Sentences, with any sentence longer than a chunk broken at word boundaries
    fn pieces<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut pieces = Vec::new();
        for sentence in text.split_sentence_bounds() {
            if sentence.chars().count() <= self.chunk_size {
                pieces.push(sentence);
            } else {
                split_long(sentence, self.chunk_size, &mut pieces);
            }
        }
        pieces
    }
}

/// Break `text` into spans of at most `max_chars` characters, preferring word boundaries
fn split_long<'a>(text: &'a str, max_chars: usize, out: &mut Vec<&'a str>) {
    let mut rest = text;
    while rest.chars().count() > max_chars {
        let hard_end = byte_offset(rest, max_chars);
        let end = rest[..hard_end]
            .rfind(char::is_whitespace)
            .map(|pos| pos + rest[pos..].chars().next().map_or(1, char::len_utf8))
            .filter(|&pos| pos > 0)
            .unwrap_or(hard_end);
        out.push(&rest[..end]);
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        out.push(rest);
    }
}

/// The last `max_chars` characters of `text`, starting on a word boundary when possible
fn overlap_tail(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return "";
    }
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }

    let tail = &text[byte_offset(text, total - max_chars)..];

    // Try to start at a sentence boundary
    if let Some(pos) = tail.find(". ") {
        return &tail[pos + 2..];
    }

    // Fall back to word boundary
    if let Some(pos) = tail.find(' ') {
        return &tail[pos + 1..];
    }

    tail
}

/// Byte offset of the `n`th character
fn byte_offset(text: &str, n: usize) -> usize {
    text.char_indices().nth(n).map_or(text.len(), |(i, _)| i)
}
