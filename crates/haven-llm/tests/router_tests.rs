#[cfg(test)]
mod tests {
    use haven_core::{HavenError, Message, Role};
    use haven_llm::mock::MockProvider;
    use haven_llm::provider::LlmRequest;
    use haven_llm::router::ModelRouter;
    use std::sync::Arc;

    fn make_request(model: &str) -> LlmRequest {
        LlmRequest {
            model: model.to_string(),
            messages: vec![Message::text(Role::User, "Hello")],
            max_tokens: 100,
            temperature: 0.7,
            tools: vec![],
            system: None,
        }
    }

    // ── Router resolve / complete ──────────────────────────────

    #[tokio::test]
    async fn test_complete_with_prefix_resolution() {
        let mock = Arc::new(MockProvider::new("anthropic").with_response("Hello from mock!"));
        let router = ModelRouter::new().with_provider(mock.clone());
        let resp = router
            .complete(&make_request("anthropic/claude-3-5-sonnet-latest"))
            .await
            .unwrap();
        assert_eq!(resp.message.text_content(), "Hello from mock!");

        let recorded = mock.recorded_requests();
        assert_eq!(recorded.lock()[0].model, "claude-3-5-sonnet-latest");
    }

    #[tokio::test]
    async fn test_prefix_is_case_insensitive() {
        let router = ModelRouter::new().with_provider(Arc::new(MockProvider::new("openai")));
        assert!(router.resolve("OpenAI/gpt-4o").is_some());
    }

    #[tokio::test]
    async fn test_model_not_found() {
        let router = ModelRouter::new();
        let result = router.complete(&make_request("nonexistent/model")).await;
        assert!(matches!(result.unwrap_err(), HavenError::ModelNotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_prefix_is_not_rerouted() {
        let router = ModelRouter::new().with_provider(Arc::new(MockProvider::new("anthropic")));
        assert!(router.resolve("openai/gpt-4o").is_none());
    }

    #[tokio::test]
    async fn test_bare_model_uses_single_provider() {
        let router = ModelRouter::new().with_provider(Arc::new(MockProvider::new("mock")));
        let (provider, model) = router.resolve("test-model").unwrap();
        assert_eq!(provider.name(), "mock");
        assert_eq!(model, "test-model");

        let two = router.with_provider(Arc::new(MockProvider::new("other")));
        assert!(two.resolve("test-model").is_none());
    }

    #[tokio::test]
    async fn test_errors_are_not_retried() {
        let mock = Arc::new(
            MockProvider::new("anthropic")
                .with_error("HTTP 500: Internal Server Error")
                .with_response("should not be reached"),
        );
        let router = ModelRouter::new().with_provider(mock.clone());
        let result = router.complete(&make_request("anthropic/claude")).await;
        assert!(matches!(result.unwrap_err(), HavenError::LlmProvider(_)));
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn test_provider_names_in_registration_order() {
        let router = ModelRouter::new()
            .with_provider(Arc::new(MockProvider::new("anthropic")))
            .with_provider(Arc::new(MockProvider::new("openai")));
        assert_eq!(router.provider_names(), vec!["anthropic", "openai"]);
    }
}
