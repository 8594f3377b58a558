//! Groq chat-completions client

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use hopeline_core::{
    ChatMessage, ChatModel, Error, Generation, ModelInput, OutputSource, Result,
};

use crate::config::GroqConfig;

/// Groq client speaking the OpenAI-compatible chat-completions protocol
pub struct GroqClient {
    config: GroqConfig,
    client: Client,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl GroqClient {
    /// Model constants
    pub const LLAMA_3_3_70B_VERSATILE: &'static str = "llama-3.3-70b-versatile";
    pub const LLAMA_3_1_8B_INSTANT: &'static str = "llama-3.1-8b-instant";

    /// Create a new Groq client from configuration
    pub fn new(config: GroqConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.api_url)
    }

    /// Perform a single chat-completions round trip
    async fn perform_completion(&self, body: &CompletionRequest<'_>) -> Result<Generation> {
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited(text));
        }
        if !status.is_success() {
            return Err(Error::Model {
                status: status.as_u16(),
                message: format!("Groq API request failed: {}", text),
            });
        }

        let (text, source) = extract_text(&text);
        if source == OutputSource::RawResponse {
            tracing::warn!(
                model = %self.config.model,
                "Groq response carried no message content, returning raw body"
            );
        }

        Ok(Generation {
            text,
            model_id: self.config.model.clone(),
            source,
        })
    }
}

/// Pull `choices[0].message.content` out of a response body.
///
/// When the field is missing the whole body is returned as the text, flagged
/// as [`OutputSource::RawResponse`].
fn extract_text(raw: &str) -> (String, OutputSource) {
    let content = serde_json::from_str::<CompletionResponse>(raw)
        .ok()
        .and_then(|r| r.choices.into_iter().next())
        .and_then(|c| c.message)
        .and_then(|m| m.content);

    match content {
        Some(text) => (text, OutputSource::MessageContent),
        None => (raw.to_string(), OutputSource::RawResponse),
    }
}

fn map_transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(err.to_string())
    } else {
        Error::Network(err.to_string())
    }
}

#[async_trait]
impl ChatModel for GroqClient {
    async fn invoke(&self, input: &ModelInput) -> Result<Generation> {
        let body = CompletionRequest {
            model: &self.config.model,
            messages: input.clone().into_messages(),
            temperature: self.config.temperature,
        };

        let retry = &self.config.retry;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.perform_completion(&body).await {
                Ok(generation) => return Ok(generation),
                Err(e) if e.is_transient() && attempt < retry.max_attempts => {
                    let delay = retry.backoff(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Groq request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_content() {
        let raw = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Try a short walk."}}]}"#;
        let (text, source) = extract_text(raw);
        assert_eq!(text, "Try a short walk.");
        assert_eq!(source, OutputSource::MessageContent);
    }

    #[test]
    fn test_extract_falls_back_to_raw_body() {
        let raw = r#"{"choices":[{"index":0,"message":{"role":"assistant"}}]}"#;
        let (text, source) = extract_text(raw);
        assert_eq!(text, raw);
        assert_eq!(source, OutputSource::RawResponse);

        let (text, source) = extract_text("not json");
        assert_eq!(text, "not json");
        assert_eq!(source, OutputSource::RawResponse);
    }

    #[test]
    fn test_completions_url() {
        let config = GroqConfig::new("gsk_test")
            .unwrap()
            .with_api_url("http://localhost:9999/v1/");
        let client = GroqClient::new(config).unwrap();
        assert_eq!(client.completions_url(), "http://localhost:9999/v1/chat/completions");
    }
}
