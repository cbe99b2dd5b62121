//! Core trait definitions for model backends.
//!
//! These async traits are implemented by the `mcqa-providers` crate.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::Attachment;
use crate::model::Modality;

// ---------------------------------------------------------------------------
// Model backend trait
// ---------------------------------------------------------------------------

/// Trait for LLM backends that answer prompts.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Human-readable provider name (e.g. "anthropic").
    fn name(&self) -> &str;

    /// Prepare the backend for use. Calling it again is a no-op.
    async fn start(&self) -> anyhow::Result<()>;

    /// Send a system/user prompt pair and return the raw reply.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse>;
}

/// Request to a model backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "gpt-4o").
    pub model: String,
    /// The system prompt.
    pub system_prompt: String,
    /// The user prompt.
    pub user_prompt: String,
    /// Image sent alongside the user prompt.
    #[serde(default)]
    pub attachment: Option<Attachment>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Response from a model backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The raw response content.
    pub content: String,
    /// Model that actually generated the response.
    pub model: String,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

// ---------------------------------------------------------------------------
// Backend selection
// ---------------------------------------------------------------------------

/// A backend together with the model to request from it.
#[derive(Clone)]
pub struct Route {
    pub backend: Arc<dyn ModelBackend>,
    pub model: String,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("backend", &self.backend.name())
            .field("model", &self.model)
            .finish()
    }
}

/// Chooses the route that answers questions of a given modality.
pub trait BackendSelector: Send + Sync {
    fn select(&self, modality: Modality) -> anyhow::Result<Route>;
}

/// Two fixed routes: one for text and PDF context, one for images.
#[derive(Debug, Clone)]
pub struct StaticBackends {
    pub text: Route,
    pub multimodal: Route,
}

impl StaticBackends {
    /// Use the same route for every modality.
    pub fn single(route: Route) -> Self {
        Self {
            text: route.clone(),
            multimodal: route,
        }
    }
}

impl BackendSelector for StaticBackends {
    fn select(&self, modality: Modality) -> anyhow::Result<Route> {
        if modality.is_multimodal() {
            Ok(self.multimodal.clone())
        } else {
            Ok(self.text.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl ModelBackend for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn start(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            Ok(GenerateResponse {
                content: String::new(),
                model: request.model.clone(),
                latency_ms: 0,
            })
        }
    }

    fn route(name: &'static str, model: &str) -> Route {
        Route {
            backend: Arc::new(Named(name)),
            model: model.to_string(),
        }
    }

    #[test]
    fn static_backends_route_by_modality() {
        let backends = StaticBackends {
            text: route("openai", "gpt-4o-mini"),
            multimodal: route("anthropic", "claude-vision"),
        };
        for modality in [Modality::Text, Modality::Pdf] {
            let r = backends.select(modality).unwrap();
            assert_eq!(r.backend.name(), "openai");
            assert_eq!(r.model, "gpt-4o-mini");
        }
        let r = backends.select(Modality::Image).unwrap();
        assert_eq!(r.backend.name(), "anthropic");
    }

    #[test]
    fn route_debug_names_backend() {
        let debug = format!("{:?}", route("mock", "m"));
        assert!(debug.contains("mock"));
    }
}
