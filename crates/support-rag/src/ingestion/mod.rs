//! Document ingestion: parsing, chunking and the directory pipeline

mod chunker;
mod parser;
mod pipeline;

pub use chunker::TextChunker;
pub use parser::{cleanup_pdf_text, FileParser, ParsedDocument};
pub use pipeline::{FileOutcome, IngestPipeline};
