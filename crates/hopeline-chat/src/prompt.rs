//! Prompt assembly
//!
//! Two mutually exclusive forms are produced. With retrieved context the
//! question is substituted into a free-text template (conversation history
//! is not included). Without it the persona and the history are sent as
//! role-tagged messages.

use serde::{Deserialize, Serialize};

use hopeline_core::{ChatMessage, ChatRequest, DocumentChunk, Error, ModelInput, Result, Role};

/// Persona used in chat mode when the request carries no override
pub const DEFAULT_PERSONA: &str = "You are a supportive, concise, non-repetitive mental health companion. Keep replies 2-4 sentences, add a next step, and avoid repeating prior assistant text.";

const CONTEXT_SLOT: &str = "{context}";
const QUESTION_SLOT: &str = "{question}";

const INTERACTIVE_TEMPLATE: &str = " You are a compassionate mental health chatbot. Respond thoughtfully to the following question:\n    {context}\n    User: {question}\n    Chatbot: ";

const SERVICE_TEMPLATE: &str = "You are a compassionate mental health chatbot. Use the retrieved context when helpful, and avoid repetition.\n{context}\nUser: {question}\nAssistant:";

/// Retrieval template plus the chat-mode persona
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    template: String,
    persona: String,
}

impl PromptTemplate {
    /// Custom template; it must contain both `{context}` and `{question}`
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for slot in [CONTEXT_SLOT, QUESTION_SLOT] {
            if !template.contains(slot) {
                return Err(Error::InvalidInput(format!("Prompt template is missing {}", slot)));
            }
        }

        Ok(Self {
            template,
            persona: DEFAULT_PERSONA.to_string(),
        })
    }

    /// Template used by the interactive command-line loop
    pub fn interactive() -> Self {
        Self {
            template: INTERACTIVE_TEMPLATE.to_string(),
            persona: DEFAULT_PERSONA.to_string(),
        }
    }

    /// Template used by the HTTP service
    pub fn service() -> Self {
        Self {
            template: SERVICE_TEMPLATE.to_string(),
            persona: DEFAULT_PERSONA.to_string(),
        }
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    /// Fill both slots in one pass, so slot markers inside the retrieved
    /// context are left untouched.
    pub fn render(&self, context: &str, question: &str) -> String {
        self.template
            .split(CONTEXT_SLOT)
            .map(|part| part.replace(QUESTION_SLOT, question))
            .collect::<Vec<_>>()
            .join(context)
    }

    /// Template mode: retrieved chunks in retrieval order, then the question
    pub fn with_context(&self, chunks: &[DocumentChunk], question: &str) -> ModelInput {
        ModelInput::Prompt(self.render(&join_context(chunks), question))
    }

    /// Chat mode: one system message, then the history without its system turns
    pub fn with_history(&self, request: &ChatRequest) -> ModelInput {
        let system = request
            .system_prompt
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.persona);

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(ChatMessage::system(system));
        messages.extend(
            request
                .messages
                .iter()
                .filter(|m| m.role != Role::System)
                .cloned(),
        );

        ModelInput::Messages(messages)
    }

    /// Chat mode for a single query with no history
    pub fn single_turn(&self, query: &str) -> ModelInput {
        ModelInput::Messages(vec![
            ChatMessage::system(self.persona.as_str()),
            ChatMessage::user(query),
        ])
    }
}

/// Join chunk texts with a blank line, keeping their order
pub fn join_context(chunks: &[DocumentChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
