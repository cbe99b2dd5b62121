//! Mock provider for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use mcqa_core::error::ProviderError;
use mcqa_core::traits::{GenerateRequest, GenerateResponse, ModelBackend};

type Responder = Box<dyn Fn(&GenerateRequest) -> String + Send + Sync>;

/// A mock backend for exercising the pipeline without real API calls.
///
/// Replies are chosen by user-prompt content: the longest registered
/// substring found in the prompt wins.
pub struct MockProvider {
    /// Map of user-prompt substring → reply.
    responses: HashMap<String, String>,
    /// Reply used when no substring matches.
    default_response: String,
    /// Computes replies instead of the table, when set.
    responder: Option<Responder>,
    /// Prompts containing this substring fail with a server error.
    fail_on: Option<String>,
    call_count: AtomicU32,
    start_count: AtomicU32,
    last_request: Mutex<Option<GenerateRequest>>,
}

impl MockProvider {
    /// Create a new mock provider with the given prompt→reply mappings.
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self {
            responses,
            default_response: String::new(),
            responder: None,
            fail_on: None,
            call_count: AtomicU32::new(0),
            start_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same reply.
    pub fn with_fixed_response(response: &str) -> Self {
        Self::new(HashMap::new()).with_default_response(response)
    }

    /// Create a mock whose replies are computed from each request.
    pub fn from_fn(responder: impl Fn(&GenerateRequest) -> String + Send + Sync + 'static) -> Self {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::new(HashMap::new())
        }
    }

    /// Reply used when no registered substring matches.
    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = response.to_string();
        self
    }

    /// Fail every request whose user prompt contains `trigger`.
    pub fn failing_on(mut self, trigger: &str) -> Self {
        self.fail_on = Some(trigger.to_string());
        self
    }

    /// Get the number of `generate` calls made to this provider.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the number of `start` calls made to this provider.
    pub fn start_count(&self) -> u32 {
        self.start_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this provider.
    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn reply_for(&self, request: &GenerateRequest) -> String {
        if let Some(responder) = &self.responder {
            return responder(request);
        }
        self.responses
            .iter()
            .filter(|(key, _)| request.user_prompt.contains(key.as_str()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_response.clone())
    }
}

#[async_trait]
impl ModelBackend for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn start(&self) -> anyhow::Result<()> {
        self.start_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        if let Some(trigger) = &self.fail_on {
            if request.user_prompt.contains(trigger.as_str()) {
                return Err(ProviderError::ApiError {
                    status: 500,
                    message: format!("mock failure triggered by '{trigger}'"),
                }
                .into());
            }
        }

        Ok(GenerateResponse {
            content: self.reply_for(request),
            model: request.model.clone(),
            latency_ms: 1,
        })
    }
}
