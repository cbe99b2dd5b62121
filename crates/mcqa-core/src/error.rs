//! Error types shared across the mcqa crates.
//!
//! `ProviderError` lives here rather than in `mcqa-providers` so the
//! orchestrator can downcast backend failures and classify them for retry
//! decisions without string matching.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::QuestionFormat;

/// Errors raised by the question pipeline itself.
#[derive(Debug, Error)]
pub enum McqaError {
    /// The question carries no options at all.
    #[error("question has no options")]
    EmptyOptions,

    /// More options than there are label letters.
    #[error("too many options: {0} (at most 26 can be labelled)")]
    TooManyOptions(usize),

    /// An option is empty once whitespace and label prefixes are removed.
    #[error("option #{0} is empty after cleaning")]
    EmptyOption(usize),

    /// Two options clean to the same text, so the answer key is not a bijection.
    #[error("duplicate option: {0}")]
    DuplicateOption(String),

    /// The ground-truth answer does not match any option.
    #[error("answer '{answer}' is not one of the options")]
    AnswerNotInOptions { answer: String },

    /// Every derived item of a rephrase/synthetic request failed.
    #[error("no viable derived responses for {format} request ({attempted} attempted)")]
    NoViableDerivedResponses {
        format: QuestionFormat,
        attempted: usize,
    },

    /// A batch finished without a single successful row.
    #[error("no rows produced a response ({failed} of {total} failed)")]
    NoSuccessfulRows { total: usize, failed: usize },

    /// The context file could not be read or decoded.
    #[error("failed to load context from {path}: {message}")]
    ContextLoad { path: PathBuf, message: String },
}

/// Errors that can occur when interacting with a model backend.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// `generate` was called before `start`.
    #[error("backend '{0}' was not started")]
    NotStarted(String),
}

impl ProviderError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationFailed(_)
                | ProviderError::ModelNotFound(_)
                | ProviderError::NotStarted(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}
