//! HTTP plumbing shared by the remote providers.

use std::sync::OnceLock;
use std::time::Duration;

use mcqa_core::error::ProviderError;

/// A `reqwest::Client` built on first `start()`.
pub(crate) struct LazyClient {
    provider: &'static str,
    timeout_secs: u64,
    cell: OnceLock<reqwest::Client>,
}

impl LazyClient {
    pub(crate) fn new(provider: &'static str, timeout_secs: u64) -> Self {
        Self {
            provider,
            timeout_secs,
            cell: OnceLock::new(),
        }
    }

    pub(crate) fn start(&self) -> Result<(), ProviderError> {
        if self.cell.get().is_some() {
            return Ok(());
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| ProviderError::NetworkError(format!("failed to build HTTP client: {e}")))?;
        // A concurrent start may have set it first
        let _ = self.cell.set(client);
        tracing::debug!(provider = self.provider, "HTTP client ready");
        Ok(())
    }

    pub(crate) fn get(&self) -> Result<&reqwest::Client, ProviderError> {
        self.cell
            .get()
            .ok_or_else(|| ProviderError::NotStarted(self.provider.to_string()))
    }

    pub(crate) fn send_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout_secs)
        } else {
            ProviderError::NetworkError(e.to_string())
        }
    }
}

/// Pull a readable message out of a JSON error body
/// (`{"error": {"message": ..}}` or `{"error": ".."}`), else the raw body.
fn error_message(body: String) -> String {
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            let error = v.get("error")?;
            error
                .get("message")
                .and_then(|m| m.as_str())
                .or_else(|| error.as_str())
                .map(str::to_string)
        });
    message.unwrap_or(body)
}

/// Map an error status to a [`ProviderError`], passing successful responses
/// through.
pub(crate) async fn check_status(
    response: reqwest::Response,
    model: &str,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }
    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(5)
            .saturating_mul(1000);
        return Err(ProviderError::RateLimited {
            retry_after_ms: retry_after,
        });
    }
    if status == 404 {
        return Err(ProviderError::ModelNotFound(model.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(body);
    if status == 401 {
        return Err(ProviderError::AuthenticationFailed(message));
    }
    Err(ProviderError::ApiError { status, message })
}

/// Wrap a body decoding failure.
pub(crate) fn decode_error(e: reqwest::Error) -> ProviderError {
    ProviderError::ApiError {
        status: 0,
        message: format!("failed to parse response: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_shapes() {
        assert_eq!(
            error_message(r#"{"error": {"message": "bad request", "type": "x"}}"#.into()),
            "bad request"
        );
        assert_eq!(error_message(r#"{"error": "model is loading"}"#.into()), "model is loading");
        assert_eq!(error_message("plain text".into()), "plain text");
    }

    #[tokio::test]
    async fn huge_retry_after_saturates() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(429).insert_header("retry-after", "99999999999999999"),
            )
            .mount(&server)
            .await;

        let response = reqwest::get(server.uri()).await.unwrap();
        let err = check_status(response, "m").await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::RateLimited {
                retry_after_ms: u64::MAX
            }
        ));
    }

    #[test]
    fn client_must_be_started() {
        let client = LazyClient::new("test", 1);
        assert!(matches!(client.get(), Err(ProviderError::NotStarted(_))));
        client.start().unwrap();
        client.start().unwrap();
        assert!(client.get().is_ok());
    }
}
