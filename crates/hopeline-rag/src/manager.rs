//! Index acquisition
//!
//! Decides at startup whether retrieval is available: load a persisted
//! index, build one from a document directory, or report why neither
//! happened. Two processes must not build into the same directory at once.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hopeline_core::{
    DEFAULT_TOP_K, DocumentChunk, Embedder, Error, IndexingConfig, Result, RetrieverState,
};

use crate::embedder::{EmbeddingConfig, OnnxEmbedder};
use crate::index::EmbeddingIndex;
use crate::loader::PdfDirectoryLoader;
use crate::splitter::TextSplitter;
use crate::vector_store::PersistentVectorStore;

/// Where the index lives and how to obtain it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding the persisted index; `None` disables retrieval
    pub persist_dir: Option<PathBuf>,
    /// PDF directory used when the index has to be built
    pub source_dir: Option<PathBuf>,
    pub build_if_missing: bool,
    pub top_k: usize,
    pub indexing: IndexingConfig,
    pub embedding: EmbeddingConfig,
}

impl IndexConfig {
    pub fn new(persist_dir: Option<PathBuf>) -> Self {
        Self {
            persist_dir,
            source_dir: None,
            build_if_missing: false,
            top_k: DEFAULT_TOP_K,
            indexing: IndexingConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }

    /// Read `CHROMA_DIR`, `DATA_DIR` and `EMBEDDING_CACHE_DIR`
    pub fn from_env() -> Self {
        let var = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        };

        let mut config = Self::new(var("CHROMA_DIR"));
        config.source_dir = var("DATA_DIR");
        config.embedding = EmbeddingConfig::from_env();
        config
    }

    pub fn with_persist_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persist_dir = Some(dir.into());
        self
    }

    /// Build from `dir` when no persisted index exists
    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(dir.into());
        self.build_if_missing = true;
        self
    }

    pub fn with_build_if_missing(mut self, build: bool) -> Self {
        self.build_if_missing = build;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

/// Obtains retrievers according to an [`IndexConfig`]
pub struct IndexManager {
    config: IndexConfig,
}

impl IndexManager {
    pub fn new(config: IndexConfig) -> Self {
        Self { config }
    }

    /// Acquire a retriever backed by the ONNX embedder
    pub async fn acquire(&self) -> RetrieverState {
        let embedding = self.config.embedding.clone();
        self.acquire_with(|| async move {
            let embedder = OnnxEmbedder::new(&embedding).await?;
            Ok::<_, Error>(Arc::new(embedder) as Arc<dyn Embedder>)
        })
        .await
    }

    /// Acquire a retriever, constructing the embedder only once an index
    /// is known to be loadable or buildable.
    ///
    /// Every failure is logged and reported as
    /// [`RetrieverState::Unavailable`].
    pub async fn acquire_with<F, Fut>(&self, make_embedder: F) -> RetrieverState
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn Embedder>>>,
    {
        match self.try_acquire(make_embedder).await {
            Ok(index) => {
                tracing::info!(chunks = index.len(), "Retrieval enabled");
                RetrieverState::Available(Arc::new(index))
            }
            Err(reason) => {
                tracing::warn!(%reason, "Retrieval unavailable, answering without document context");
                RetrieverState::Unavailable(reason)
            }
        }
    }

    async fn try_acquire<F, Fut>(&self, make_embedder: F) -> std::result::Result<EmbeddingIndex, String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn Embedder>>>,
    {
        let persist_dir = self
            .config
            .persist_dir
            .as_deref()
            .ok_or_else(|| "no index directory configured".to_string())?;

        if PersistentVectorStore::exists(persist_dir) {
            let embedder = make_embedder()
                .await
                .map_err(|e| format!("embedder unavailable: {}", e))?;
            let index = EmbeddingIndex::load(persist_dir, embedder)
                .await
                .map_err(|e| e.to_string())?;
            return Ok(index.with_top_k(self.config.top_k));
        }

        let source_dir = match (&self.config.source_dir, self.config.build_if_missing) {
            (Some(dir), true) => dir,
            _ => return Err(format!("no index found at {}", persist_dir.display())),
        };

        let chunks = ingest_directory(source_dir, &self.config.indexing)
            .await
            .map_err(|e| e.to_string())?;
        if chunks.is_empty() {
            return Err(format!(
                "no index found at {} and no documents in {}",
                persist_dir.display(),
                source_dir.display()
            ));
        }

        let embedder = make_embedder()
            .await
            .map_err(|e| format!("embedder unavailable: {}", e))?;
        let index = EmbeddingIndex::build(chunks, embedder, persist_dir, &self.config.indexing)
            .await
            .map_err(|e| e.to_string())?;

        Ok(index.with_top_k(self.config.top_k))
    }

    /// Build the index from the source directory with the ONNX embedder,
    /// replacing whatever is persisted
    pub async fn rebuild(&self) -> Result<EmbeddingIndex> {
        let embedder = OnnxEmbedder::new(&self.config.embedding).await?;
        self.rebuild_with(Arc::new(embedder)).await
    }

    /// Build the index from the source directory, replacing whatever is
    /// persisted. Unlike acquisition, failures are returned.
    pub async fn rebuild_with(&self, embedder: Arc<dyn Embedder>) -> Result<EmbeddingIndex> {
        let persist_dir = self
            .config
            .persist_dir
            .as_deref()
            .ok_or_else(|| Error::Configuration("No index directory configured".to_string()))?;
        let source_dir = self
            .config
            .source_dir
            .as_deref()
            .ok_or_else(|| Error::Configuration("No document directory configured".to_string()))?;

        let chunks = ingest_directory(source_dir, &self.config.indexing).await?;
        if chunks.is_empty() {
            return Err(Error::Ingestion(format!(
                "No PDF text found in {}",
                source_dir.display()
            )));
        }

        let index = EmbeddingIndex::build(chunks, embedder, persist_dir, &self.config.indexing).await?;
        Ok(index.with_top_k(self.config.top_k))
    }
}

/// Load every PDF in `dir` and split it into chunks.
///
/// A missing directory or one without PDFs yields no chunks.
pub async fn ingest_directory(dir: &Path, config: &IndexingConfig) -> Result<Vec<DocumentChunk>> {
    let splitter = TextSplitter::from_config(config)?;
    let loader = PdfDirectoryLoader::new(dir);

    let chunks = tokio::task::spawn_blocking(move || -> Result<Vec<DocumentChunk>> {
        let pages = loader.load()?;
        Ok(splitter.split_pages(&pages))
    })
    .await
    .map_err(|e| Error::Other(format!("Task join error: {}", e)))??;

    tracing::info!(dir = %dir.display(), chunks = chunks.len(), "Ingested documents");
    Ok(chunks)
}
