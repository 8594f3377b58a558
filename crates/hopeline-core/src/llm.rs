//! Chat model trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ChatMessage, Result};

/// What gets sent to the model for one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "input", rename_all = "snake_case")]
pub enum ModelInput {
    /// A single free-text prompt with retrieved context already substituted
    Prompt(String),
    /// A role-tagged message sequence
    Messages(Vec<ChatMessage>),
}

impl ModelInput {
    /// Flatten into the message list a chat-completions endpoint expects
    pub fn into_messages(self) -> Vec<ChatMessage> {
        match self {
            ModelInput::Prompt(prompt) => vec![ChatMessage::user(prompt)],
            ModelInput::Messages(messages) => messages,
        }
    }
}

/// Where the text of a [`Generation`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSource {
    /// The model's message content field
    MessageContent,
    /// Degraded path: the response had no text field and was rendered whole
    RawResponse,
}

/// Result of a model invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub model_id: String,
    pub source: OutputSource,
}

impl Generation {
    pub fn is_degraded(&self) -> bool {
        self.source == OutputSource::RawResponse
    }
}

/// Trait for hosted chat models (e.g. Groq)
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send one input and wait for the complete reply
    async fn invoke(&self, input: &ModelInput) -> Result<Generation>;

    /// Identifier of the model being called
    fn model_id(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    #[test]
    fn test_prompt_becomes_single_user_message() {
        let messages = ModelInput::Prompt("context\nUser: hi".into()).into_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "context\nUser: hi");
    }

    #[test]
    fn test_degraded_flag() {
        let generation = Generation {
            text: "{}".into(),
            model_id: "m".into(),
            source: OutputSource::RawResponse,
        };
        assert!(generation.is_degraded());
    }
}
