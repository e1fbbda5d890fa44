//! Storage module for persistent data storage
//!
//! SQLite-backed vector storage: chunk metadata in a table, vectors in a
//! sqlite-vec index per collection.

mod sqlite_store;

pub use sqlite_store::SqliteVectorStore;
