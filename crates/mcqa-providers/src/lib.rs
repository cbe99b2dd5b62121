//! mcqa-providers: model backend integrations.
//!
//! Implements `ModelBackend` for OpenAI, Anthropic and Ollama, plus a mock
//! backend, and routes question modalities to them from configuration.

pub mod anthropic;
pub mod config;
mod http;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use config::{
    create_provider, load_config, load_config_from, parse_model_spec, ConfiguredSelector,
    McqaConfig, ProviderConfig,
};
pub use mcqa_core::error::ProviderError;
