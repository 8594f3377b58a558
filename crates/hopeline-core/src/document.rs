//! Document chunk types and ingestion settings

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where a chunk was cut from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSource {
    pub path: PathBuf,
    /// Zero-based page number, when the source is paginated
    pub page: Option<u32>,
}

/// A bounded slice of a source document, as stored in the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub source: ChunkSource,
}

impl DocumentChunk {
    pub fn new(text: impl Into<String>, source: ChunkSource) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }
}

/// Configuration for document chunking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,
    /// Chunks embedded per embedder call
    pub batch_size: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            batch_size: 32,
        }
    }
}
