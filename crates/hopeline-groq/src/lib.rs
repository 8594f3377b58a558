//! Groq integration for HopeLine
//!
//! This crate provides the Groq implementation of the ChatModel trait.

mod client;
mod config;

#[cfg(test)]
mod tests;

pub use client::GroqClient;
pub use config::GroqConfig;

// Re-export core types for convenience
pub use hopeline_core::{
    ChatModel, Generation, ModelInput, OutputSource, RetryConfig, Error, Result,
};
