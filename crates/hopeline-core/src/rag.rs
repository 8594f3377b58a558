//! Retriever trait and acquisition state

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::{DocumentChunk, Result};

/// Default number of chunks returned per query
pub const DEFAULT_TOP_K: usize = 4;

/// Trait for anything that can find chunks relevant to a query
///
/// Chunks are returned nearest first.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<DocumentChunk>>;

    /// Number of chunks the retriever can search over
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of trying to obtain a retriever at startup
#[derive(Clone)]
pub enum RetrieverState {
    Available(Arc<dyn Retriever>),
    Unavailable(String),
}

impl RetrieverState {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        RetrieverState::Unavailable(reason.into())
    }

    pub fn is_available(&self) -> bool {
        matches!(self, RetrieverState::Available(_))
    }
}

impl fmt::Debug for RetrieverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrieverState::Available(retriever) => f
                .debug_tuple("Available")
                .field(&format_args!("{} chunks", retriever.len()))
                .finish(),
            RetrieverState::Unavailable(reason) => {
                f.debug_tuple("Unavailable").field(reason).finish()
            }
        }
    }
}
