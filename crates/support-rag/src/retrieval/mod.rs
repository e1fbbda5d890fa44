//! Query embedding and nearest-neighbour retrieval

mod retriever;

pub use retriever::Retriever;
