//! Shared state for the chat service

use std::sync::Arc;

use hopeline_chat::{PromptTemplate, ResponsePipeline};
use hopeline_core::{ChatModel, Error, Result, RetrieverState};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    backend: Backend,
    model_name: String,
}

enum Backend {
    Ready(ResponsePipeline),
    /// The model could not be configured at startup; every chat request
    /// answers with this error text
    Misconfigured {
        reason: String,
        retrieval: RetrieverState,
    },
}

impl AppState {
    pub fn new(pipeline: ResponsePipeline) -> Self {
        let model_name = pipeline.model_id().to_string();
        Self {
            inner: Arc::new(AppStateInner {
                backend: Backend::Ready(pipeline),
                model_name,
            }),
        }
    }

    /// State whose chat requests all fail with `reason`
    pub fn misconfigured(reason: &Error, model_name: impl Into<String>, retrieval: RetrieverState) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                backend: Backend::Misconfigured {
                    reason: reason.to_string(),
                    retrieval,
                },
                model_name: model_name.into(),
            }),
        }
    }

    /// Build from the outcome of model construction
    pub fn from_parts(
        model: Result<Arc<dyn ChatModel>>,
        model_name: impl Into<String>,
        retrieval: RetrieverState,
        template: PromptTemplate,
    ) -> Self {
        match model {
            Ok(model) => Self::new(ResponsePipeline::new(model, retrieval, template)),
            Err(e) => {
                tracing::error!(error = %e, "Chat model unavailable; /chat will report the error");
                Self::misconfigured(&e, model_name, retrieval)
            }
        }
    }

    /// The pipeline, or the startup configuration error
    pub fn pipeline(&self) -> std::result::Result<&ResponsePipeline, String> {
        match &self.inner.backend {
            Backend::Ready(pipeline) => Ok(pipeline),
            Backend::Misconfigured { reason, .. } => Err(reason.clone()),
        }
    }

    pub fn retrieval_enabled(&self) -> bool {
        match &self.inner.backend {
            Backend::Ready(pipeline) => pipeline.retrieval().is_available(),
            Backend::Misconfigured { retrieval, .. } => retrieval.is_available(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.inner.model_name
    }
}
