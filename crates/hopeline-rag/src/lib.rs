//! Retrieval for HopeLine
//!
//! This crate loads PDF documents, splits them into overlapping chunks, embeds
//! them into a persisted vector index and hands out retrievers over that index.

mod embedder;
mod index;
mod loader;
mod manager;
mod splitter;
mod vector_store;


pub use embedder::{EmbeddingConfig, OnnxEmbedder};
pub use index::EmbeddingIndex;
pub use loader::{LoadedPage, PdfDirectoryLoader};
pub use manager::{IndexConfig, IndexManager, ingest_directory};
pub use splitter::TextSplitter;
pub use vector_store::{PersistentVectorStore, ScoredChunk, VectorRecord};

// Re-export core types for convenience
pub use hopeline_core::{
    ChunkSource, DocumentChunk, Embedder, Error, IndexingConfig, Result, Retriever,
    RetrieverState, DEFAULT_TOP_K,
};
