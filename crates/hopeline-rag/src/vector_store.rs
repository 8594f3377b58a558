//! Persisted vector store
//!
//! Records live in memory and are written as a single `index.json` file
//! under the store directory, tagged with the embedding model that produced
//! them. Writes go through a temporary file that is renamed into place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use hopeline_core::{DocumentChunk, Error, Result};

/// File name of the persisted index inside its directory
pub const INDEX_FILE: &str = "index.json";

const FORMAT_VERSION: u32 = 1;

/// One embedded chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: Uuid,
    pub embedding: Vec<f32>,
    pub chunk: DocumentChunk,
}

/// A search hit with its cosine similarity to the query
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    model: String,
    dimensions: usize,
    built_at: DateTime<Utc>,
    records: Vec<VectorRecord>,
}

/// Flat cosine-similarity store persisted as JSON
#[derive(Debug)]
pub struct PersistentVectorStore {
    dir: PathBuf,
    model: String,
    dimensions: usize,
    built_at: DateTime<Utc>,
    records: Vec<VectorRecord>,
}

impl PersistentVectorStore {
    /// Empty store for vectors produced by `model`
    pub fn new(dir: impl Into<PathBuf>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            dir: dir.into(),
            model: model.into(),
            dimensions,
            built_at: Utc::now(),
            records: Vec::new(),
        }
    }

    /// Whether a persisted index exists in `dir`
    pub fn exists(dir: &Path) -> bool {
        dir.join(INDEX_FILE).is_file()
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[VectorRecord] {
        &self.records
    }

    /// Add one embedded chunk
    pub fn insert(&mut self, embedding: Vec<f32>, chunk: DocumentChunk) -> Result<Uuid> {
        if embedding.len() != self.dimensions {
            return Err(Error::VectorStore(format!(
                "Embedding has {} dimensions, store expects {}",
                embedding.len(),
                self.dimensions
            )));
        }

        let id = Uuid::new_v4();
        self.records.push(VectorRecord {
            id,
            embedding,
            chunk,
        });
        Ok(id)
    }

    /// Write the store to `<dir>/index.json`, replacing any previous file
    pub fn persist(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let file = IndexFile {
            version: FORMAT_VERSION,
            model: self.model.clone(),
            dimensions: self.dimensions,
            built_at: self.built_at,
            records: self.records.clone(),
        };

        let mut writer = BufWriter::new(tempfile::NamedTempFile::new_in(&self.dir)?);
        serde_json::to_writer(&mut writer, &file)?;
        let tmp = writer.into_inner().map_err(|e| e.into_error())?;
        tmp.persist(self.index_path())
            .map_err(|e| Error::VectorStore(format!("Failed to persist index: {}", e.error)))?;

        tracing::debug!(path = %self.index_path().display(), records = self.len(), "Persisted vector store");
        Ok(())
    }

    /// Read a store previously written by [`persist`](Self::persist)
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let path = dir.join(INDEX_FILE);

        let bytes = std::fs::read(&path).map_err(|e| {
            Error::VectorStore(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let file: IndexFile = serde_json::from_slice(&bytes).map_err(|e| {
            Error::VectorStore(format!("Corrupt index {}: {}", path.display(), e))
        })?;

        if file.version != FORMAT_VERSION {
            return Err(Error::VectorStore(format!(
                "Unsupported index version {} in {}",
                file.version,
                path.display()
            )));
        }
        if let Some(bad) = file.records.iter().find(|r| r.embedding.len() != file.dimensions) {
            return Err(Error::VectorStore(format!(
                "Record {} has {} dimensions, index declares {}",
                bad.id,
                bad.embedding.len(),
                file.dimensions
            )));
        }

        Ok(Self {
            dir,
            model: file.model,
            dimensions: file.dimensions,
            built_at: file.built_at,
            records: file.records,
        })
    }

    /// The `k` records most similar to `query`, nearest first
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if query.len() != self.dimensions {
            return Err(Error::VectorStore(format!(
                "Query has {} dimensions, store expects {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(f32, &VectorRecord)> = self
            .records
            .iter()
            .map(|record| (cosine_similarity(query, &record.embedding), record))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, record)| ScoredChunk {
                chunk: record.chunk.clone(),
                score,
            })
            .collect())
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
