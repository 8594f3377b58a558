//! Tests for the interactive session

#[cfg(test)]
mod session_tests {
    use crate::{Exchange, GOODBYE, InteractiveSession, SessionEnd};
    use async_trait::async_trait;
    use hopeline_chat::{PromptTemplate, ResponsePipeline};
    use hopeline_core::{
        ChatModel, Error, Generation, ModelInput, OutputSource, Result, RetrieverState,
    };
    use std::io::Cursor;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the last message back, numbering each call
    #[derive(Default)]
    struct EchoModel {
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn invoke(&self, input: &ModelInput) -> Result<Generation> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on == Some(call) {
                return Err(Error::Network("connection reset".into()));
            }
            let last = input
                .clone()
                .into_messages()
                .pop()
                .map(|m| m.content)
                .unwrap_or_default();
            Ok(Generation {
                text: format!("echo {}: {}", call, last),
                model_id: "echo".into(),
                source: OutputSource::MessageContent,
            })
        }

        fn model_id(&self) -> &str {
            "echo"
        }
    }

    fn pipeline(model: Arc<EchoModel>) -> ResponsePipeline {
        ResponsePipeline::new(
            model,
            RetrieverState::unavailable("disabled"),
            PromptTemplate::interactive(),
        )
    }

    #[tokio::test]
    async fn test_session_answers_until_exit() {
        let model = Arc::new(EchoModel::default());
        let pipeline = pipeline(model.clone());
        let mut output = Vec::new();

        let mut session = InteractiveSession::new(
            &pipeline,
            Cursor::new("I feel tired\nEXIT\nnever read\n"),
            &mut output,
        );
        let end = session.run().await.unwrap();
        let transcript = session.into_transcript();

        assert_eq!(end, SessionEnd::Exit);
        assert_eq!(
            transcript,
            vec![Exchange {
                query: "I feel tired".into(),
                reply: "echo 1: I feel tired".into(),
            }]
        );
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);

        let printed = String::from_utf8(output).unwrap();
        assert_eq!(
            printed,
            format!("\nHuman: Chatbot: echo 1: I feel tired\n\nHuman: {}\n", GOODBYE)
        );
    }

    #[tokio::test]
    async fn test_blank_line_gets_fixed_reply() {
        let model = Arc::new(EchoModel::default());
        let pipeline = pipeline(model.clone());
        let mut output = Vec::new();

        let mut session = InteractiveSession::new(&pipeline, Cursor::new("   \n"), &mut output);
        let end = session.run().await.unwrap();

        assert_eq!(end, SessionEnd::EndOfInput);
        assert!(session.transcript().is_empty());
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        drop(session);

        let printed = String::from_utf8(output).unwrap();
        assert!(printed.contains("Chatbot: Please provide a valid input\n"));
    }

    #[tokio::test]
    async fn test_windows_line_endings() {
        let pipeline = pipeline(Arc::new(EchoModel::default()));
        let mut output = Vec::new();

        let mut session =
            InteractiveSession::new(&pipeline, Cursor::new("hello\r\nexit\r\n"), &mut output);
        assert_eq!(session.run().await.unwrap(), SessionEnd::Exit);
        assert_eq!(session.transcript()[0].query, "hello");
    }

    #[tokio::test]
    async fn test_model_error_ends_session() {
        let model = Arc::new(EchoModel {
            fail_on: Some(2),
            ..Default::default()
        });
        let pipeline = pipeline(model);
        let mut output = Vec::new();

        let mut session =
            InteractiveSession::new(&pipeline, Cursor::new("one\ntwo\nthree\n"), &mut output);
        let err = session.run().await.unwrap_err();

        assert!(matches!(err, Error::Network(_)));
        assert_eq!(session.transcript().len(), 1);
    }
}
