//! Embedding trait for turning text into vectors

use async_trait::async_trait;

use crate::Result;

/// Trait for text embedders
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of document chunks, preserving order
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Name of the embedding model; persisted indexes are tied to it
    fn model_name(&self) -> &str;
}
