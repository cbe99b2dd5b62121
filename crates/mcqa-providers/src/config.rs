//! Configuration, provider factory and model routing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mcqa_core::model::Modality;
use mcqa_core::orchestrator::OrchestratorConfig;
use mcqa_core::traits::{BackendSelector, ModelBackend, Route};

use crate::anthropic::AnthropicProvider;
use crate::mock::MockProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;

/// Configuration for a single LLM provider.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Anthropic {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
    /// Canned replies, for dry runs and tests.
    Mock {
        #[serde(default)]
        responses: HashMap<String, String>,
        #[serde(default)]
        default_response: String,
        #[serde(default)]
        fail_on: Option<String>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Anthropic {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Ollama { base_url } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Mock {
                responses,
                fail_on,
                ..
            } => f
                .debug_struct("Mock")
                .field("responses", &responses.len())
                .field("fail_on", fail_on)
                .finish(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

/// Top-level mcqa configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McqaConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// `provider/model` answering text and PDF questions.
    #[serde(default = "default_model")]
    pub text_model: String,
    /// `provider/model` answering image questions.
    #[serde(default = "default_model")]
    pub multimodal_model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Max tokens per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Max retries on transient provider errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Pause between consecutive batch rows in milliseconds.
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,
    /// Shuffle and relabel options before prompting.
    #[serde(default = "default_true")]
    pub randomize_options: bool,
    /// Questions requested from a synthetic prompt.
    #[serde(default = "default_synthetic_count")]
    pub synthetic_count: usize,
    /// Output directory for records and reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_model() -> String {
    "openai/gpt-4o".to_string()
}
fn default_temperature() -> f64 {
    0.01
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_retries() -> u32 {
    2
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_request_delay() -> u64 {
    0
}
fn default_true() -> bool {
    true
}
fn default_synthetic_count() -> usize {
    5
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./mcqa-results")
}

impl Default for McqaConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            text_model: default_model(),
            multimodal_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            request_delay_ms: default_request_delay(),
            randomize_options: true,
            synthetic_count: default_synthetic_count(),
            output_dir: default_output_dir(),
        }
    }
}

impl McqaConfig {
    /// Orchestrator settings derived from this configuration.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            randomize_options: self.randomize_options,
            synthetic_count: self.synthetic_count,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(len) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + len];
        let value = std::env::var(var_name).unwrap_or_default();
        result.replace_range(start..start + len + 1, &value);
    }
    result
}

/// Resolve env vars in a provider config.
fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    let resolve = |s: &Option<String>| s.as_deref().map(resolve_env_vars);
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: resolve(base_url),
            org_id: resolve(org_id),
        },
        ProviderConfig::Anthropic { api_key, base_url } => ProviderConfig::Anthropic {
            api_key: resolve_env_vars(api_key),
            base_url: resolve(base_url),
        },
        ProviderConfig::Ollama { base_url } => ProviderConfig::Ollama {
            base_url: resolve_env_vars(base_url),
        },
        mock @ ProviderConfig::Mock { .. } => mock.clone(),
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `mcqa.toml` in the current directory
/// 2. `~/.config/mcqa/config.toml`
///
/// Environment variable overrides: `MCQA_OPENAI_KEY`, `MCQA_ANTHROPIC_KEY`,
/// `MCQA_TEXT_MODEL`, `MCQA_MULTIMODAL_MODEL`.
pub fn load_config() -> Result<McqaConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<McqaConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => [Some(PathBuf::from("mcqa.toml")), global_config_path()]
            .into_iter()
            .flatten()
            .find(|p| p.exists()),
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<McqaConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => McqaConfig::default(),
    };

    apply_env_overrides(&mut config);

    // Resolve env vars in all provider configs
    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();

    Ok(config)
}

fn apply_env_overrides(config: &mut McqaConfig) {
    if let Ok(key) = std::env::var("MCQA_ANTHROPIC_KEY") {
        let entry = config
            .providers
            .entry("anthropic".into())
            .or_insert(ProviderConfig::Anthropic {
                api_key: String::new(),
                base_url: None,
            });
        if let ProviderConfig::Anthropic { api_key, .. } = entry {
            *api_key = key;
        }
    }

    if let Ok(key) = std::env::var("MCQA_OPENAI_KEY") {
        let entry = config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let ProviderConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }

    if let Ok(model) = std::env::var("MCQA_TEXT_MODEL") {
        config.text_model = model;
    }
    if let Ok(model) = std::env::var("MCQA_MULTIMODAL_MODEL") {
        config.multimodal_model = model;
    }
}

fn global_config_path() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(|h| {
        PathBuf::from(h)
            .join(".config")
            .join("mcqa")
            .join("config.toml")
    })
}

/// Create a provider instance from its configuration.
pub fn create_provider(config: &ProviderConfig) -> Arc<dyn ModelBackend> {
    match config {
        ProviderConfig::Anthropic { api_key, base_url } => {
            Arc::new(AnthropicProvider::new(api_key, base_url.clone()))
        }
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => Arc::new(OpenAiProvider::new(api_key, base_url.clone(), org_id.clone())),
        ProviderConfig::Ollama { base_url } => Arc::new(OllamaProvider::new(base_url)),
        ProviderConfig::Mock {
            responses,
            default_response,
            fail_on,
        } => {
            let mut mock =
                MockProvider::new(responses.clone()).with_default_response(default_response);
            if let Some(trigger) = fail_on {
                mock = mock.failing_on(trigger);
            }
            Arc::new(mock)
        }
    }
}

/// Split a `provider/model` string.
pub fn parse_model_spec(spec: &str) -> Result<(&str, &str)> {
    match spec.split_once('/') {
        Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
            Ok((provider, model))
        }
        _ => anyhow::bail!("invalid model '{spec}', expected 'provider/model'"),
    }
}

/// Routes modalities to providers named in an [`McqaConfig`].
///
/// A fresh provider client is created on every selection.
#[derive(Debug, Clone)]
pub struct ConfiguredSelector {
    providers: HashMap<String, ProviderConfig>,
    text_model: String,
    multimodal_model: String,
}

impl ConfiguredSelector {
    /// Build a selector, checking that both model specs name configured
    /// providers.
    pub fn new(config: &McqaConfig) -> Result<Self> {
        for spec in [&config.text_model, &config.multimodal_model] {
            let (provider, _) = parse_model_spec(spec)?;
            if !config.providers.contains_key(provider) {
                anyhow::bail!(
                    "provider '{provider}' (from model '{spec}') is not configured; run `mcqa init` or add [providers.{provider}] to mcqa.toml"
                );
            }
        }
        Ok(Self {
            providers: config.providers.clone(),
            text_model: config.text_model.clone(),
            multimodal_model: config.multimodal_model.clone(),
        })
    }
}

impl BackendSelector for ConfiguredSelector {
    fn select(&self, modality: Modality) -> Result<Route> {
        let spec = if modality.is_multimodal() {
            &self.multimodal_model
        } else {
            &self.text_model
        };
        let (provider, model) = parse_model_spec(spec)?;
        let config = self
            .providers
            .get(provider)
            .with_context(|| format!("provider '{provider}' is not configured"))?;
        tracing::debug!(%modality, provider, model, "selected backend");
        Ok(Route {
            backend: create_provider(config),
            model: model.to_string(),
        })
    }
}
