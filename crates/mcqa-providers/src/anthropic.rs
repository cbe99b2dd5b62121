//! Anthropic API provider implementation.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mcqa_core::traits::{GenerateRequest, GenerateResponse, ModelBackend};

use crate::http::{check_status, decode_error, LazyClient};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const API_VERSION: &str = "2023-06-01";

/// Anthropic messages API provider.
pub struct AnthropicProvider {
    api_key: String,
    base_url: String,
    client: LazyClient,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, base_url: Option<String>) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client: LazyClient::new("anthropic", DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    system: String,
    messages: Vec<AnthropicMessage>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<AnthropicBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum AnthropicBlock {
    Image { source: ImageSource },
    Text { text: String },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: String,
    data: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    model: String,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl ModelBackend for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn start(&self) -> anyhow::Result<()> {
        Ok(self.client.start()?)
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let client = self.client.get()?;
        let start = Instant::now();

        // The image goes first so the question reads as being about it
        let mut content = Vec::with_capacity(2);
        if let Some(attachment) = &request.attachment {
            content.push(AnthropicBlock::Image {
                source: ImageSource {
                    kind: "base64",
                    media_type: attachment.media_type.clone(),
                    data: attachment.data.clone(),
                },
            });
        }
        content.push(AnthropicBlock::Text {
            text: request.user_prompt.clone(),
        });

        let body = AnthropicRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system_prompt.clone(),
            messages: vec![AnthropicMessage {
                role: "user",
                content,
            }],
        };

        let response = client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.client.send_error(e))?;
        let response = check_status(response, &request.model).await?;

        let api_response: AnthropicResponse = response.json().await.map_err(decode_error)?;

        let content = api_response
            .content
            .into_iter()
            .filter_map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(GenerateResponse {
            content,
            model: api_response.model,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
