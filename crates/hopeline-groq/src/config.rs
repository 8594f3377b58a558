//! Groq configuration

use serde::Serialize;
use std::env;
use std::fmt;
use std::time::Duration;

use hopeline_core::{Error, Result, RetryConfig};

/// Configuration for the Groq chat-completions client
#[derive(Clone, Serialize)]
pub struct GroqConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub model: String,
    pub api_url: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl GroqConfig {
    pub const DEFAULT_MODEL: &'static str = "llama-3.3-70b-versatile";
    pub const DEFAULT_API_URL: &'static str = "https://api.groq.com/openai/v1";

    /// Create configuration from environment variables
    ///
    /// `GROQ_API_KEY` is mandatory; a missing or blank key fails here,
    /// before any client exists or any request is sent.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GROQ_API_KEY").unwrap_or_default();
        let mut config = Self::new(api_key)?;

        if let Some(model) = lookup("GROQ_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }
        if let Some(url) = lookup("GROQ_API_URL").filter(|u| !u.trim().is_empty()) {
            config.api_url = url.trim_end_matches('/').to_string();
        }

        Ok(config)
    }

    /// Create configuration with an explicit key and defaults for everything else
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::Configuration("Missing GROQ_API_KEY".to_string()));
        }

        Ok(Self {
            api_key,
            model: Self::DEFAULT_MODEL.to_string(),
            api_url: Self::DEFAULT_API_URL.to_string(),
            temperature: 0.0,
            timeout: Duration::from_secs(60),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for GroqConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroqConfig")
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}
