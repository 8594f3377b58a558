//! Response pipeline: resolve query, assemble prompt, call the model

use std::sync::Arc;

use hopeline_core::{ChatModel, ChatRequest, ModelInput, Reply, Result, RetrieverState};

use crate::prompt::PromptTemplate;

/// Reply given to blank interactive input, without calling the model
pub const INVALID_INPUT_REPLY: &str = "Please provide a valid input";

/// Answers chat requests with a model and optional retrieval.
///
/// Built once at startup and shared; it keeps no conversation memory.
pub struct ResponsePipeline {
    model: Arc<dyn ChatModel>,
    retrieval: RetrieverState,
    template: PromptTemplate,
}

impl ResponsePipeline {
    pub fn new(model: Arc<dyn ChatModel>, retrieval: RetrieverState, template: PromptTemplate) -> Self {
        Self {
            model,
            retrieval,
            template,
        }
    }

    pub fn retrieval(&self) -> &RetrieverState {
        &self.retrieval
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    /// Answer a chat request carrying the client-side history
    pub async fn respond(&self, request: &ChatRequest) -> Result<Reply> {
        let input = match &self.retrieval {
            RetrieverState::Available(retriever) => {
                let query = request.last_user_message();
                let chunks = retriever.retrieve(query).await?;
                tracing::debug!(chunks = chunks.len(), "Answering with retrieved context");
                self.template.with_context(&chunks, query)
            }
            RetrieverState::Unavailable(_) => {
                tracing::debug!(turns = request.messages.len(), "Answering from conversation history");
                self.template.with_history(request)
            }
        };

        self.generate(&input).await
    }

    /// Answer one line of interactive input
    pub async fn respond_to_query(&self, query: &str) -> Result<Reply> {
        if query.trim().is_empty() {
            return Ok(Reply::new(INVALID_INPUT_REPLY));
        }

        let input = match &self.retrieval {
            RetrieverState::Available(retriever) => {
                let chunks = retriever.retrieve(query).await?;
                self.template.with_context(&chunks, query)
            }
            RetrieverState::Unavailable(_) => self.template.single_turn(query),
        };

        self.generate(&input).await
    }

    async fn generate(&self, input: &ModelInput) -> Result<Reply> {
        let generation = self.model.invoke(input).await?;
        if generation.is_degraded() {
            tracing::warn!(model = %generation.model_id, "Replying with raw model response");
        }
        Ok(Reply::new(generation.text))
    }
}
