//! SQLite vector store with sqlite-vec nearest-neighbour search
//!
//! Chunk text and metadata live in a plain `chunks` table. Each collection
//! gets its own `vec0` virtual table, keyed by the chunk row id, holding the
//! embeddings under a cosine metric. The `collections` table records the
//! embedding model and dimensionality each collection was built with.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Arc, Once};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::providers::VectorStoreProvider;
use crate::types::{DocumentChunk, QueryResult};

/// Largest `k` a vec0 KNN query accepts
const MAX_KNN: usize = 4096;

static VEC_EXTENSION: Once = Once::new();

/// Load sqlite-vec into every connection opened by this process
fn register_vec_extension() {
    VEC_EXTENSION.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite_vec::sqlite3_vec_init as *const (),
        )));
    });
}

/// Vector store over a shared SQLite connection, scoped to one collection
#[derive(Clone)]
pub struct SqliteVectorStore {
    conn: Arc<Mutex<Connection>>,
    collection: String,
    vec_table: String,
}

/// Embedding model a collection was built with
#[derive(Debug, Clone, PartialEq, Eq)]
struct CollectionInfo {
    model: String,
    dimensions: usize,
}

/// Name of the vec0 table backing a collection
fn vec_table_name(collection: &str) -> String {
    let digest = hex::encode(Sha256::digest(collection.as_bytes()));
    format!("vec_chunks_{}", &digest[..16])
}

impl SqliteVectorStore {
    /// Create or open the database at the given path
    pub fn open<P: AsRef<Path>>(path: P, collection: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        register_vec_extension();
        let conn = Connection::open(path)
            .map_err(|e| Error::vector_db(format!("Failed to open {}: {}", path.display(), e)))?;

        let store = Self::with_connection(conn, collection.into());
        store.migrate(true)?;
        tracing::info!(path = %path.display(), collection = %store.collection, "Vector store opened");
        Ok(store)
    }

    /// Create an in-memory database
    pub fn in_memory(collection: impl Into<String>) -> Result<Self> {
        register_vec_extension();
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::vector_db(format!("Failed to open in-memory database: {}", e)))?;

        let store = Self::with_connection(conn, collection.into());
        store.migrate(false)?;
        Ok(store)
    }

    fn with_connection(conn: Connection, collection: String) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            vec_table: vec_table_name(&collection),
            collection,
        }
    }

    /// Another collection in the same database
    pub fn with_collection(&self, collection: impl Into<String>) -> Self {
        let collection = collection.into();
        Self {
            conn: Arc::clone(&self.conn),
            vec_table: vec_table_name(&collection),
            collection,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Run database migrations
    fn migrate(&self, on_disk: bool) -> Result<()> {
        let conn = self.conn.lock();

        let version: String = conn
            .query_row("SELECT vec_version()", [], |row| row.get(0))
            .map_err(|e| Error::vector_db(format!("sqlite-vec is not available: {}", e)))?;
        tracing::debug!(sqlite_vec = %version, "sqlite-vec loaded");

        if on_disk {
            conn.execute_batch(
                r#"
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                PRAGMA temp_store=MEMORY;
                "#,
            )?;
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                model TEXT NOT NULL,
                dimensions INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                chunk_id TEXT NOT NULL,
                source TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                file_type TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                text TEXT NOT NULL,
                UNIQUE (collection, chunk_id)
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(collection, source);
            "#,
        )?;

        Ok(())
    }

    fn collection_info(conn: &Connection, collection: &str) -> Result<Option<CollectionInfo>> {
        let info = conn
            .query_row(
                "SELECT model, dimensions FROM collections WHERE name = ?1",
                params![collection],
                |row| {
                    Ok(CollectionInfo {
                        model: row.get(0)?,
                        dimensions: row.get::<_, i64>(1)? as usize,
                    })
                },
            )
            .optional()?;
        Ok(info)
    }

    fn count(conn: &Connection, collection: &str) -> Result<usize> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Record the model and make sure the vec0 table has the right width
    ///
    /// Callers only change the dimensionality of an empty collection.
    fn record_collection(&self, conn: &Connection, model: &str, dimensions: usize) -> Result<()> {
        let resized = Self::collection_info(conn, &self.collection)?
            .is_some_and(|info| info.dimensions != dimensions);
        if resized {
            conn.execute_batch(&format!("DROP TABLE IF EXISTS {};", self.vec_table))?;
        }

        conn.execute(
            "INSERT OR REPLACE INTO collections (name, model, dimensions, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![self.collection, model, dimensions as i64, chrono::Utc::now().to_rfc3339()],
        )?;
        conn.execute_batch(&format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS {} USING vec0(embedding float[{}] distance_metric=cosine);",
            self.vec_table, dimensions
        ))?;
        Ok(())
    }

    fn ensure_model_sync(&self, model: &str, dimensions: usize) -> Result<()> {
        let conn = self.conn.lock();
        match Self::collection_info(&conn, &self.collection)? {
            Some(info) if Self::count(&conn, &self.collection)? > 0 => {
                if info.dimensions != dimensions {
                    return Err(Error::DimensionMismatch {
                        expected: info.dimensions,
                        actual: dimensions,
                    });
                }
                if !info.model.is_empty() && info.model != model {
                    return Err(Error::Config(format!(
                        "collection '{}' was built with embedding model '{}', not '{}'; re-ingest with --recreate",
                        self.collection, info.model, model
                    )));
                }
                if info.model.is_empty() {
                    self.record_collection(&conn, model, dimensions)?;
                }
                Ok(())
            }
            _ => self.record_collection(&conn, model, dimensions),
        }
    }

    fn upsert_sync(&self, chunks: &[DocumentChunk]) -> Result<usize> {
        let Some(first) = chunks.first() else {
            return Ok(0);
        };
        let dimensions = first.embedding.len();
        if dimensions == 0 {
            return Err(Error::vector_db(format!(
                "chunk {} has no embedding",
                first.chunk_id
            )));
        }
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dimensions) {
            return Err(Error::DimensionMismatch {
                expected: dimensions,
                actual: bad.embedding.len(),
            });
        }

        let mut conn = self.conn.lock();
        match Self::collection_info(&conn, &self.collection)? {
            Some(info) if info.dimensions != dimensions => {
                if Self::count(&conn, &self.collection)? > 0 {
                    return Err(Error::DimensionMismatch {
                        expected: info.dimensions,
                        actual: dimensions,
                    });
                }
                self.record_collection(&conn, "", dimensions)?;
            }
            Some(_) => {}
            None => self.record_collection(&conn, "", dimensions)?,
        }

        let tx = conn.transaction()?;
        {
            let mut find = tx.prepare("SELECT id FROM chunks WHERE collection = ?1 AND chunk_id = ?2")?;
            let mut insert = tx.prepare(
                "INSERT INTO chunks
                 (collection, chunk_id, source, chunk_index, file_type, content_hash, text)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            let mut update = tx.prepare(
                "UPDATE chunks
                 SET source = ?2, chunk_index = ?3, file_type = ?4, content_hash = ?5, text = ?6
                 WHERE id = ?1",
            )?;
            let mut delete_vector =
                tx.prepare(&format!("DELETE FROM {} WHERE rowid = ?1", self.vec_table))?;
            let mut insert_vector = tx.prepare(&format!(
                "INSERT INTO {}(rowid, embedding) VALUES (?1, ?2)",
                self.vec_table
            ))?;

            for chunk in chunks {
                let existing: Option<i64> = find
                    .query_row(params![self.collection, chunk.chunk_id], |row| row.get(0))
                    .optional()?;
                let id = match existing {
                    Some(id) => {
                        update.execute(params![
                            id,
                            chunk.source_document_name,
                            chunk.chunk_index as i64,
                            chunk.file_type.as_str(),
                            chunk.content_hash,
                            chunk.text,
                        ])?;
                        delete_vector.execute(params![id])?;
                        id
                    }
                    None => {
                        insert.execute(params![
                            self.collection,
                            chunk.chunk_id,
                            chunk.source_document_name,
                            chunk.chunk_index as i64,
                            chunk.file_type.as_str(),
                            chunk.content_hash,
                            chunk.text,
                        ])?;
                        tx.last_insert_rowid()
                    }
                };
                insert_vector.execute(params![id, encode_vector(&chunk.embedding)])?;
            }
        }
        tx.commit()?;

        tracing::debug!(collection = %self.collection, count = chunks.len(), "Upserted chunks");
        Ok(chunks.len())
    }

    fn query_sync(&self, vector: &[f32], k: usize) -> Result<Vec<QueryResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock();
        let Some(info) = Self::collection_info(&conn, &self.collection)? else {
            return Ok(Vec::new());
        };
        if info.dimensions != vector.len() {
            return Err(Error::DimensionMismatch {
                expected: info.dimensions,
                actual: vector.len(),
            });
        }

        let mut stmt = conn.prepare(&format!(
            "WITH knn AS (
                 SELECT rowid, distance FROM {} WHERE embedding MATCH ?1 AND k = ?2
             )
             SELECT c.chunk_id, c.source, c.text, knn.distance
             FROM knn JOIN chunks c ON c.id = knn.rowid
             ORDER BY knn.distance, c.chunk_id",
            self.vec_table
        ))?;
        let results = stmt
            .query_map(params![encode_vector(vector), k.min(MAX_KNN) as i64], |row| {
                Ok(QueryResult {
                    chunk_id: row.get(0)?,
                    source_document_name: row.get(1)?,
                    text: row.get(2)?,
                    distance: row.get::<_, f64>(3)? as f32,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(results)
    }

    fn delete_by_source_sync(&self, source: &str) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let ids: Vec<i64> = {
            let mut stmt = tx.prepare("SELECT id FROM chunks WHERE collection = ?1 AND source = ?2")?;
            let ids = stmt
                .query_map(params![self.collection, source], |row| row.get(0))?
                .collect::<std::result::Result<Vec<i64>, _>>()?;
            ids
        };

        if !ids.is_empty() {
            let mut delete_vector =
                tx.prepare(&format!("DELETE FROM {} WHERE rowid = ?1", self.vec_table))?;
            for id in &ids {
                delete_vector.execute(params![id])?;
            }
        }
        tx.execute(
            "DELETE FROM chunks WHERE collection = ?1 AND source = ?2",
            params![self.collection, source],
        )?;
        tx.commit()?;
        Ok(ids.len())
    }

    fn reset_sync(&self) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", self.vec_table))?;
        tx.execute("DELETE FROM chunks WHERE collection = ?1", params![self.collection])?;
        tx.execute("DELETE FROM collections WHERE name = ?1", params![self.collection])?;
        tx.commit()?;
        tracing::info!(collection = %self.collection, "Collection reset");
        Ok(())
    }

    fn len_sync(&self) -> Result<usize> {
        let conn = self.conn.lock();
        Self::count(&conn, &self.collection)
    }

    fn sources_sync(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT source FROM chunks WHERE collection = ?1 ORDER BY source",
        )?;
        let sources = stmt
            .query_map(params![self.collection], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(sources)
    }

    /// Run a blocking store operation off the async runtime
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(SqliteVectorStore) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(store))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }
}

#[async_trait]
impl VectorStoreProvider for SqliteVectorStore {
    async fn upsert(&self, chunks: &[DocumentChunk]) -> Result<usize> {
        let chunks = chunks.to_vec();
        self.blocking(move |store| store.upsert_sync(&chunks)).await
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryResult>> {
        let vector = vector.to_vec();
        self.blocking(move |store| store.query_sync(&vector, k)).await
    }

    async fn delete_by_source(&self, source_document_name: &str) -> Result<usize> {
        let source = source_document_name.to_string();
        self.blocking(move |store| store.delete_by_source_sync(&source)).await
    }

    async fn reset(&self) -> Result<()> {
        self.blocking(|store| store.reset_sync()).await
    }

    async fn len(&self) -> Result<usize> {
        self.blocking(|store| store.len_sync()).await
    }

    async fn sources(&self) -> Result<Vec<String>> {
        self.blocking(|store| store.sources_sync()).await
    }

    async fn ensure_model(&self, model: &str, dimensions: usize) -> Result<()> {
        let model = model.to_string();
        self.blocking(move |store| store.ensure_model_sync(&model, dimensions)).await
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

/// Little-endian `f32` blob, the vector format sqlite-vec reads
fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}
