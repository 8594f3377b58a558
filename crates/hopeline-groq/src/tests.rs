//! Tests for the Groq client against a local mock endpoint

#[cfg(test)]
mod client_tests {
    use crate::{ChatModel, GroqClient, GroqConfig, ModelInput, OutputSource, RetryConfig};
    use axum::{
        Json, Router,
        extract::State,
        http::{HeaderMap, StatusCode, header},
        routing::post,
    };
    use hopeline_core::{ChatMessage, Error};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct MockState {
        /// Status codes to answer with before succeeding
        failures: Arc<Mutex<Vec<u16>>>,
        bodies: Arc<Mutex<Vec<Value>>>,
        /// Content-Type and Authorization of each request
        headers: Arc<Mutex<Vec<(String, String)>>>,
        reply: Value,
    }

    async fn completions(
        State(state): State<MockState>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let header_value = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        state
            .headers
            .lock()
            .unwrap()
            .push((header_value(header::CONTENT_TYPE), header_value(header::AUTHORIZATION)));
        state.bodies.lock().unwrap().push(body);
        let next_failure = {
            let mut failures = state.failures.lock().unwrap();
            if failures.is_empty() { None } else { Some(failures.remove(0)) }
        };
        match next_failure {
            Some(code) => (
                StatusCode::from_u16(code).unwrap(),
                Json(json!({"error": {"message": "mock failure"}})),
            ),
            None => (StatusCode::OK, Json(state.reply.clone())),
        }
    }

    async fn spawn_mock(state: MockState) -> String {
        let app = Router::new()
            .route("/openai/v1/chat/completions", post(completions))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/openai/v1", addr)
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    fn content_reply(text: &str) -> Value {
        json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}}]
        })
    }

    fn client_for(url: String) -> GroqClient {
        let config = GroqConfig::new("gsk_test")
            .unwrap()
            .with_api_url(url)
            .with_temperature(0.3)
            .with_retry(fast_retry());
        GroqClient::new(config).unwrap()
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let lookup = HashMap::from([("GROQ_MODEL", "llama-3.1-8b-instant")]);
        let err = GroqConfig::from_lookup(|k| lookup.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("GROQ_API_KEY"));

        let err = GroqConfig::new("   ").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_config_from_lookup_defaults() {
        let lookup = HashMap::from([("GROQ_API_KEY", "gsk_live")]);
        let config = GroqConfig::from_lookup(|k| lookup.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.model, GroqClient::LLAMA_3_3_70B_VERSATILE);
        assert_eq!(config.api_url, GroqConfig::DEFAULT_API_URL);
        assert!(!format!("{:?}", config).contains("gsk_live"));
    }

    #[test]
    fn test_config_serialization_hides_key() {
        let config = GroqConfig::new("secret")
            .unwrap()
            .with_model(GroqClient::LLAMA_3_1_8B_INSTANT)
            .with_temperature(0.3);

        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("api_key").is_none());
        assert_eq!(value["model"], "llama-3.1-8b-instant");
        assert_eq!(value["retry"]["max_attempts"], 3);
        assert!((value["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_chat_mode_sends_messages() {
        let state = MockState {
            reply: content_reply("Breathe slowly for a minute."),
            ..Default::default()
        };
        let bodies = state.bodies.clone();
        let headers = state.headers.clone();
        let client = client_for(spawn_mock(state).await);

        let input = ModelInput::Messages(vec![
            ChatMessage::system("Be supportive."),
            ChatMessage::user("I feel anxious"),
        ]);
        let generation = client.invoke(&input).await.unwrap();

        assert_eq!(generation.text, "Breathe slowly for a minute.");
        assert_eq!(generation.source, OutputSource::MessageContent);
        assert_eq!(generation.model_id, "llama-3.3-70b-versatile");

        let sent = bodies.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["model"], "llama-3.3-70b-versatile");
        assert_eq!(sent[0]["messages"][0]["role"], "system");
        assert_eq!(sent[0]["messages"][1]["role"], "user");
        assert_eq!(sent[0]["messages"][1]["content"], "I feel anxious");

        let headers = headers.lock().unwrap();
        assert_eq!(
            headers[0],
            ("application/json".to_string(), "Bearer gsk_test".to_string())
        );
    }

    #[tokio::test]
    async fn test_prompt_mode_sends_single_user_message() {
        let state = MockState {
            reply: content_reply("Grounding means noticing your senses."),
            ..Default::default()
        };
        let bodies = state.bodies.clone();
        let client = client_for(spawn_mock(state).await);

        client
            .invoke(&ModelInput::Prompt("context\nUser: what is grounding?\nAssistant:".into()))
            .await
            .unwrap();

        let sent = bodies.lock().unwrap();
        let messages = sent[0]["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
    }

    #[tokio::test]
    async fn test_missing_content_uses_raw_response() {
        let state = MockState {
            reply: json!({"choices": []}),
            ..Default::default()
        };
        let client = client_for(spawn_mock(state).await);

        let generation = client.invoke(&ModelInput::Prompt("hi".into())).await.unwrap();
        assert!(generation.is_degraded());
        assert!(generation.text.contains("choices"));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let state = MockState {
            failures: Arc::new(Mutex::new(vec![429, 503])),
            reply: content_reply("Back again."),
            ..Default::default()
        };
        let bodies = state.bodies.clone();
        let client = client_for(spawn_mock(state).await);

        let generation = client.invoke(&ModelInput::Prompt("hi".into())).await.unwrap();
        assert_eq!(generation.text, "Back again.");
        assert_eq!(bodies.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let state = MockState {
            failures: Arc::new(Mutex::new(vec![500, 500, 500, 500])),
            reply: content_reply("never"),
            ..Default::default()
        };
        let bodies = state.bodies.clone();
        let client = client_for(spawn_mock(state).await);

        let err = client.invoke(&ModelInput::Prompt("hi".into())).await.unwrap_err();
        assert!(matches!(err, Error::Model { status: 500, .. }));
        assert_eq!(bodies.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_client_errors_fail_fast() {
        let state = MockState {
            failures: Arc::new(Mutex::new(vec![401])),
            reply: content_reply("never"),
            ..Default::default()
        };
        let bodies = state.bodies.clone();
        let client = client_for(spawn_mock(state).await);

        let err = client.invoke(&ModelInput::Prompt("hi".into())).await.unwrap_err();
        assert!(matches!(err, Error::Model { status: 401, .. }));
        assert_eq!(bodies.lock().unwrap().len(), 1);
    }
}
