//! Embedding index over document chunks

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use hopeline_core::{
    DEFAULT_TOP_K, DocumentChunk, Embedder, Error, IndexingConfig, Result, Retriever,
};

use crate::vector_store::{PersistentVectorStore, ScoredChunk};

/// A persisted vector index paired with the embedder that built it
pub struct EmbeddingIndex {
    store: Arc<PersistentVectorStore>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl EmbeddingIndex {
    /// Embed every chunk and persist the result under `dir`.
    ///
    /// The index is written before this returns; on error nothing is left
    /// in place of a previous index.
    pub async fn build(
        chunks: Vec<DocumentChunk>,
        embedder: Arc<dyn Embedder>,
        dir: &Path,
        config: &IndexingConfig,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::Ingestion("No chunks to index".to_string()));
        }

        tracing::info!(chunks = chunks.len(), dir = %dir.display(), model = embedder.model_name(), "Building embedding index");

        let mut store: Option<PersistentVectorStore> = None;
        let batch_size = config.batch_size.max(1);

        for (batch_no, batch) in chunks.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = embedder.embed_documents(&texts).await?;

            if embeddings.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "Embedder returned {} vectors for {} chunks",
                    embeddings.len(),
                    batch.len()
                )));
            }

            for (embedding, chunk) in embeddings.into_iter().zip(batch) {
                let store = store.get_or_insert_with(|| {
                    PersistentVectorStore::new(dir, embedder.model_name(), embedding.len())
                });
                store.insert(embedding, chunk.clone())?;
            }

            tracing::debug!(batch = batch_no + 1, "Embedded batch");
        }

        let store = store.ok_or_else(|| Error::Embedding("No embeddings produced".to_string()))?;
        let store = tokio::task::spawn_blocking(move || -> Result<PersistentVectorStore> {
            store.persist()?;
            Ok(store)
        })
        .await
        .map_err(|e| Error::Other(format!("Task join error: {}", e)))??;

        tracing::info!(records = store.len(), "Embedding index persisted");

        Ok(Self {
            store: Arc::new(store),
            embedder,
            top_k: DEFAULT_TOP_K,
        })
    }

    /// Reopen an index persisted under `dir` without re-embedding.
    ///
    /// Fails when the index was built with a different embedding model.
    pub async fn load(dir: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let dir = dir.to_path_buf();
        let store = tokio::task::spawn_blocking(move || PersistentVectorStore::open(dir))
            .await
            .map_err(|e| Error::Other(format!("Task join error: {}", e)))??;

        if store.model() != embedder.model_name() {
            return Err(Error::VectorStore(format!(
                "Index was built with '{}' but the embedder is '{}'",
                store.model(),
                embedder.model_name()
            )));
        }

        tracing::info!(
            records = store.len(),
            dimensions = store.dimensions(),
            built_at = %store.built_at(),
            "Loaded embedding index"
        );

        Ok(Self {
            store: Arc::new(store),
            embedder,
            top_k: DEFAULT_TOP_K,
        })
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// The `k` chunks nearest to `text`, nearest first
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let embedding = self.embedder.embed_query(text).await?;
        self.store.search(&embedding, k)
    }
}

#[async_trait]
impl Retriever for EmbeddingIndex {
    async fn retrieve(&self, query: &str) -> Result<Vec<DocumentChunk>> {
        let hits = self
            .query(query, self.top_k)
            .await
            .map_err(|e| Error::Retrieval(e.to_string()))?;

        tracing::debug!(hits = hits.len(), top_score = ?hits.first().map(|h| h.score), "Retrieved context");
        Ok(hits.into_iter().map(|hit| hit.chunk).collect())
    }

    fn len(&self) -> usize {
        self.store.len()
    }
}
