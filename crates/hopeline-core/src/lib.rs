//! Core traits and types for HopeLine
//!
//! This crate defines the fundamental traits and types shared by every HopeLine crate.
//! It provides capability-facing interfaces for chat models, embedders and retrievers,
//! making the pipeline test-friendly and independent of any particular provider.

pub mod document;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod rag;
pub mod types;

pub use document::{ChunkSource, DocumentChunk, IndexingConfig};
pub use embedding::Embedder;
pub use error::{Error, Result};
pub use llm::{ChatModel, Generation, ModelInput, OutputSource};
pub use rag::{Retriever, RetrieverState, DEFAULT_TOP_K};
pub use types::*;
