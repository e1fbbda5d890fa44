//! Ingestion pipeline orchestration: walk, parse, chunk, embed, store

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::{DocumentChunk, FileType, IngestReport};

use super::chunker::TextChunker;
use super::parser::FileParser;

/// What happened to a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Chunks written for the file
    Ingested(usize),
    /// File left out, with the reason
    Skipped(String),
}

/// Main ingestion pipeline
#[derive(Clone)]
pub struct IngestPipeline {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
}

impl IngestPipeline {
    /// Create a new ingestion pipeline
    pub fn new(
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
        }
    }

    /// Ingest every supported file under `dir`
    ///
    /// Unreadable or unparseable files are skipped and reported. Sources
    /// whose file no longer exists are removed from the store. Only storage
    /// failures abort the run.
    pub async fn ingest_directory(&self, dir: &Path, reset: bool) -> Result<IngestReport> {
        let start = Instant::now();
        let mut report = IngestReport::default();

        if reset {
            self.store.reset().await?;
        }

        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "Documents directory not found, nothing to ingest");
            return Ok(report);
        }

        self.store
            .ensure_model(self.embedder.model(), self.embedder.dimensions())
            .await?;

        tracing::info!(dir = %dir.display(), reset, "Starting ingestion");

        let mut seen = HashSet::new();
        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                    report.skip(path, e.to_string());
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            report.files_seen += 1;
            let path = entry.path();
            let supported = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(FileType::from_extension)
                .is_some();
            if !supported {
                tracing::debug!(path = %path.display(), "Ignoring unsupported file");
                report.ignored += 1;
                continue;
            }

            let source_name = source_name(dir, path);
            seen.insert(source_name.clone());
            match self.ingest_file(path, &source_name).await? {
                FileOutcome::Ingested(count) => {
                    report.files_ingested += 1;
                    report.chunks_written += count;
                }
                FileOutcome::Skipped(reason) => {
                    tracing::warn!(file = %source_name, reason = %reason, "Skipping file");
                    report.skip(path, reason);
                }
            }
        }

        for stale in self.store.sources().await? {
            if !seen.contains(&stale) {
                let removed = self.store.delete_by_source(&stale).await?;
                tracing::info!(source = %stale, chunks = removed, "Removed source no longer on disk");
                report.sources_removed += 1;
            }
        }

        report.processing_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            files_seen = report.files_seen,
            files_ingested = report.files_ingested,
            skipped = report.skipped.len(),
            ignored = report.ignored,
            removed = report.sources_removed,
            chunks = report.chunks_written,
            elapsed_ms = report.processing_time_ms,
            "Ingestion finished"
        );
        Ok(report)
    }

    /// Parse, chunk, embed and store one file under `source_name`
    ///
    /// Previous chunks of the same source are replaced, or dropped when the
    /// file is skipped.
    pub async fn ingest_file(&self, path: &Path, source_name: &str) -> Result<FileOutcome> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) => return self.skip(source_name, format!("cannot read file: {}", e)).await,
        };

        let filename = source_name.to_string();
        let parsed = tokio::task::spawn_blocking(move || FileParser::parse(&filename, &data))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?;
        let parsed = match parsed {
            Ok(parsed) if parsed.is_empty() => {
                return self.skip(source_name, "no extractable text".to_string()).await
            }
            Ok(parsed) => parsed,
            Err(e) => return self.skip(source_name, e.to_string()).await,
        };

        let texts = self.chunker.chunk_text(&parsed.content);
        if texts.is_empty() {
            return self.skip(source_name, "text too short to chunk".to_string()).await;
        }

        let embeddings = match self.embedder.embed_batch(&texts).await {
            Ok(embeddings) if embeddings.len() == texts.len() => embeddings,
            Ok(embeddings) => {
                let reason = format!(
                    "embedder returned {} vectors for {} chunks",
                    embeddings.len(),
                    texts.len()
                );
                return self.skip(source_name, reason).await;
            }
            Err(e) => return self.skip(source_name, e.to_string()).await,
        };

        let chunks: Vec<DocumentChunk> = texts
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (text, embedding))| {
                DocumentChunk::new(
                    source_name,
                    index as u32,
                    text,
                    parsed.file_type,
                    parsed.content_hash.as_str(),
                )
                .with_embedding(embedding)
            })
            .collect();

        let replaced = self.store.delete_by_source(source_name).await?;
        let written = self.store.upsert(&chunks).await?;

        tracing::info!(
            file = source_name,
            file_type = parsed.file_type.as_str(),
            pages = parsed.total_pages,
            chunks = written,
            replaced,
            "Ingested file"
        );
        Ok(FileOutcome::Ingested(written))
    }

    /// Drop whatever an earlier run stored for a file that is now skipped
    async fn skip(&self, source_name: &str, reason: String) -> Result<FileOutcome> {
        let dropped = self.store.delete_by_source(source_name).await?;
        if dropped > 0 {
            tracing::debug!(file = source_name, chunks = dropped, "Dropped chunks of skipped file");
        }
        Ok(FileOutcome::Skipped(reason))
    }
}

/// Path relative to the ingestion root, with `/` separators
fn source_name(root: &Path, path: &Path) -> String {
    let relative: PathBuf = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteVectorStore;
    use crate::testing::{FailingEmbedder, HashingEmbedder};
    use std::fs;

    fn pipeline(store: Arc<SqliteVectorStore>) -> IngestPipeline {
        IngestPipeline::new(
            TextChunker::new(200, 40).with_min_size(10),
            Arc::new(HashingEmbedder::new(64)),
            store,
        )
    }

    fn write_docs(dir: &Path) {
        fs::write(dir.join("refunds.txt"), "The refund window is 30 days. Contact support to start a return.").unwrap();
        fs::create_dir(dir.join("guides")).unwrap();
        fs::write(dir.join("guides").join("shipping.md"), "# Shipping\nOrders ship within two business days.").unwrap();
        fs::write(dir.join("broken.pdf"), b"not really a pdf").unwrap();
        fs::write(dir.join("photo.png"), b"\x89PNG").unwrap();
    }

    #[tokio::test]
    async fn test_ingest_directory_skips_and_ignores() {
        let dir = tempfile::tempdir().unwrap();
        write_docs(dir.path());
        let store = Arc::new(SqliteVectorStore::in_memory("docs").unwrap());

        let report = pipeline(store.clone()).ingest_directory(dir.path(), false).await.unwrap();

        assert_eq!(report.files_seen, 4);
        assert_eq!(report.files_ingested, 2);
        assert_eq!(report.ignored, 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].path.ends_with("broken.pdf"));
        assert_eq!(report.chunks_written, store.len().await.unwrap());
        assert_eq!(
            store.sources().await.unwrap(),
            vec!["guides/shipping.md".to_string(), "refunds.txt".to_string()]
        );
    }

    #[tokio::test]
    async fn test_reingest_has_no_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        write_docs(dir.path());
        let store = Arc::new(SqliteVectorStore::in_memory("docs").unwrap());
        let pipeline = pipeline(store.clone());

        let first = pipeline.ingest_directory(dir.path(), false).await.unwrap();
        let second = pipeline.ingest_directory(dir.path(), false).await.unwrap();

        assert_eq!(first.chunks_written, second.chunks_written);
        assert_eq!(store.len().await.unwrap(), first.chunks_written);
    }

    #[tokio::test]
    async fn test_changed_document_replaces_old_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("policy.txt");
        let long_text = "Returns are accepted in store. ".repeat(20);
        fs::write(&file, &long_text).unwrap();
        let store = Arc::new(SqliteVectorStore::in_memory("docs").unwrap());
        let pipeline = pipeline(store.clone());

        let first = pipeline.ingest_directory(dir.path(), false).await.unwrap();
        assert!(first.chunks_written > 1);

        fs::write(&file, "Returns are no longer accepted.").unwrap();
        pipeline.ingest_directory(dir.path(), false).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_deleted_file_is_removed_on_reingest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("refunds.txt"), "The refund window is 30 days.").unwrap();
        fs::write(dir.path().join("shipping.txt"), "Orders ship within two business days.").unwrap();
        let store = Arc::new(SqliteVectorStore::in_memory("docs").unwrap());
        let pipeline = pipeline(store.clone());
        pipeline.ingest_directory(dir.path(), false).await.unwrap();

        fs::remove_file(dir.path().join("refunds.txt")).unwrap();
        let report = pipeline.ingest_directory(dir.path(), false).await.unwrap();

        assert_eq!(report.sources_removed, 1);
        assert_eq!(store.sources().await.unwrap(), vec!["shipping.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_emptied_file_drops_previous_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("refunds.txt");
        fs::write(&file, "The refund window is 30 days.").unwrap();
        fs::write(dir.path().join("shipping.txt"), "Orders ship within two business days.").unwrap();
        let store = Arc::new(SqliteVectorStore::in_memory("docs").unwrap());
        let pipeline = pipeline(store.clone());
        pipeline.ingest_directory(dir.path(), false).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 2);

        fs::write(&file, "").unwrap();
        let report = pipeline.ingest_directory(dir.path(), false).await.unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, "no extractable text");
        assert_eq!(report.sources_removed, 0);
        assert_eq!(store.len().await.unwrap(), 1);
        assert_eq!(store.sources().await.unwrap(), vec!["shipping.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_and_empty_directories() {
        let store = Arc::new(SqliteVectorStore::in_memory("docs").unwrap());
        let pipeline = pipeline(store.clone());

        let missing = pipeline
            .ingest_directory(Path::new("/definitely/not/here"), false)
            .await
            .unwrap();
        assert_eq!(missing.files_seen, 0);

        let dir = tempfile::tempdir().unwrap();
        let empty = pipeline.ingest_directory(dir.path(), false).await.unwrap();
        assert_eq!(empty.files_seen, 0);
        assert_eq!(empty.chunks_written, 0);
    }

    #[tokio::test]
    async fn test_recreate_drops_previous_sources() {
        let dir = tempfile::tempdir().unwrap();
        write_docs(dir.path());
        let store = Arc::new(SqliteVectorStore::in_memory("docs").unwrap());
        let pipeline = pipeline(store.clone());
        pipeline.ingest_directory(dir.path(), false).await.unwrap();

        fs::remove_file(dir.path().join("refunds.txt")).unwrap();
        pipeline.ingest_directory(dir.path(), true).await.unwrap();

        assert_eq!(store.sources().await.unwrap(), vec!["guides/shipping.md".to_string()]);
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("refunds.txt"), "The refund window is 30 days.").unwrap();
        let store = Arc::new(SqliteVectorStore::in_memory("docs").unwrap());
        let pipeline = IngestPipeline::new(TextChunker::new(200, 40), Arc::new(FailingEmbedder), store.clone());

        let report = pipeline.ingest_directory(dir.path(), false).await.unwrap();

        assert_eq!(report.files_ingested, 0);
        assert_eq!(report.skipped.len(), 1);
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_ingest_docx() {
        use docx_rs::{Docx, Paragraph, Run};

        let dir = tempfile::tempdir().unwrap();
        let file = fs::File::create(dir.path().join("warranty.docx")).unwrap();
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Every device carries a one year warranty.")))
            .build()
            .pack(file)
            .unwrap();
        let store = Arc::new(SqliteVectorStore::in_memory("docs").unwrap());

        let report = pipeline(store.clone()).ingest_directory(dir.path(), false).await.unwrap();

        assert_eq!(report.files_ingested, 1);
        let hits = store
            .query(&HashingEmbedder::new(64).embed("warranty").await.unwrap(), 1)
            .await
            .unwrap();
        assert!(hits[0].text.contains("one year warranty"));
    }

    #[test]
    fn test_source_name_is_relative() {
        let root = Path::new("/data");
        assert_eq!(source_name(root, Path::new("/data/a/b.pdf")), "a/b.pdf");
        assert_eq!(source_name(root, Path::new("/data/c.txt")), "c.txt");
    }
}
