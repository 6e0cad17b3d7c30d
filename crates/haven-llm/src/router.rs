use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::provider::{LlmProvider, LlmRequest, LlmResponse};
use haven_core::{HavenError, Result};

/// Routes model requests to the provider named by the model's prefix.
///
/// Errors from the provider are returned as-is: there is no retry and no
/// failover, so a failed turn surfaces to the caller exactly once.
#[derive(Clone, Default)]
pub struct ModelRouter {
    providers: Vec<Arc<dyn LlmProvider>>,
}

impl ModelRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider.
    pub fn add_provider(&mut self, provider: Arc<dyn LlmProvider>) {
        info!(provider = provider.name(), "registered LLM provider");
        self.providers.push(provider);
    }

    /// Builder-style variant of [`add_provider`](Self::add_provider).
    pub fn with_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.add_provider(provider);
        self
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Find the provider for a model string like "anthropic/claude-3-5-sonnet-latest".
    ///
    /// A bare model name with no prefix goes to the only registered provider,
    /// if there is exactly one.
    pub fn resolve(&self, model: &str) -> Option<(Arc<dyn LlmProvider>, String)> {
        if let Some((prefix, model_name)) = model.split_once('/') {
            return self
                .providers
                .iter()
                .find(|p| p.name().eq_ignore_ascii_case(prefix))
                .map(|p| (Arc::clone(p), model_name.to_string()));
        }
        match self.providers.as_slice() {
            [only] => Some((Arc::clone(only), model.to_string())),
            _ => None,
        }
    }

    /// Complete a request on the provider matching `request.model`.
    pub async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let Some((provider, model_name)) = self.resolve(&request.model) else {
            warn!(model = %request.model, "no provider registered for model");
            return Err(HavenError::ModelNotFound(request.model.clone()));
        };

        let mut req = request.clone();
        req.model = model_name;
        debug!(provider = provider.name(), model = %req.model, "routing completion");
        provider.complete(&req).await
    }
}
