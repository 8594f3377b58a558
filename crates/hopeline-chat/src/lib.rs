//! Conversation handling for HopeLine
//!
//! Turns a chat request into model input, with or without retrieved context,
//! and runs it through a chat model.

mod pipeline;
mod prompt;


pub use pipeline::{INVALID_INPUT_REPLY, ResponsePipeline};
pub use prompt::{DEFAULT_PERSONA, PromptTemplate, join_context};

// Re-export core types for convenience
pub use hopeline_core::{
    ChatMessage, ChatModel, ChatRequest, Error, ModelInput, Reply, Result, Retriever,
    RetrieverState,
};
