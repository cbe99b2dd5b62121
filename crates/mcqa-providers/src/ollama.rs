//! Ollama (local LLM) provider implementation.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mcqa_core::error::ProviderError;
use mcqa_core::traits::{GenerateRequest, GenerateResponse, ModelBackend};

use crate::http::{check_status, decode_error, LazyClient};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_TIMEOUT_SECS: u64 = 300; // Local models are slower

/// Ollama local LLM provider. Vision models receive images through the
/// message `images` field.
pub struct OllamaProvider {
    base_url: String,
    client: LazyClient,
}

impl OllamaProvider {
    pub fn new(base_url: &str) -> Self {
        let base = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };

        Self {
            base_url: base.trim_end_matches('/').to_string(),
            client: LazyClient::new("ollama", DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: OllamaResponseMessage,
    model: String,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

#[async_trait]
impl ModelBackend for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn start(&self) -> anyhow::Result<()> {
        Ok(self.client.start()?)
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let client = self.client.get()?;
        let start = Instant::now();

        let body = OllamaRequest {
            model: request.model.clone(),
            messages: vec![
                OllamaMessage {
                    role: "system",
                    content: request.system_prompt.clone(),
                    images: vec![],
                },
                OllamaMessage {
                    role: "user",
                    content: request.user_prompt.clone(),
                    images: request
                        .attachment
                        .iter()
                        .map(|a| a.data.clone())
                        .collect(),
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let response = client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ProviderError::NetworkError(format!(
                        "Ollama not reachable at {}. Is it running? Start with: ollama serve",
                        self.base_url
                    ))
                } else {
                    self.client.send_error(e)
                }
            })?;
        let response = check_status(response, &request.model).await?;

        let api_response: OllamaResponse = response.json().await.map_err(decode_error)?;

        Ok(GenerateResponse {
            content: api_response.message.content,
            model: api_response.model,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcqa_core::context::Attachment;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(model: &str, attachment: Option<Attachment>) -> GenerateRequest {
        GenerateRequest {
            model: model.into(),
            system_prompt: "You answer multiple choice questions.".into(),
            user_prompt: "<Case>\n<Question>q</Question>\n</Case>".into(),
            attachment,
            max_tokens: 1024,
            temperature: 0.01,
        }
    }

    #[tokio::test]
    async fn successful_generation() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "message": {"role": "assistant", "content": "<Answer>A. Metformin</Answer>"},
            "model": "llama3.1:70b",
            "prompt_eval_count": 30,
            "eval_count": 15
        });

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "stream": false,
                "options": {"num_predict": 1024}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(&server.uri());
        provider.start().await.unwrap();
        let response = provider
            .generate(&request("llama3.1:70b", None))
            .await
            .unwrap();
        assert_eq!(response.content, "<Answer>A. Metformin</Answer>");
        assert_eq!(response.model, "llama3.1:70b");
    }

    #[tokio::test]
    async fn image_sent_in_images_field() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "messages": [{"role": "system"}, {"role": "user", "images": ["cG5n"]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": {"role": "assistant", "content": "ok"},
                "model": "llava"
            })))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(&server.uri());
        provider.start().await.unwrap();
        let attachment = Attachment {
            media_type: "image/png".into(),
            data: "cG5n".into(),
        };
        let response = provider
            .generate(&request("llava", Some(attachment)))
            .await
            .unwrap();
        assert_eq!(response.content, "ok");
    }

    #[tokio::test]
    async fn model_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(&server.uri());
        provider.start().await.unwrap();
        let err = provider
            .generate(&request("nonexistent", None))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(err.downcast_ref::<ProviderError>().unwrap().is_permanent());
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let provider = OllamaProvider::new("http://127.0.0.1:9");
        provider.start().await.unwrap();
        let err = provider
            .generate(&request("llama3", None))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::NetworkError(_))
        ));
    }
}
