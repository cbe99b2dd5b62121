pub mod ask;
pub mod init;
pub mod run;
pub mod validate;

use std::sync::Arc;

use anyhow::Result;

use mcqa_core::context::FsContextLoader;
use mcqa_core::orchestrator::Orchestrator;
use mcqa_core::output::OutputSink;
use mcqa_providers::{ConfiguredSelector, McqaConfig};

/// Wire an orchestrator to the configured backends and the local filesystem.
fn build_orchestrator(config: &McqaConfig, sink: Arc<dyn OutputSink>) -> Result<Orchestrator> {
    let selector = ConfiguredSelector::new(config)?;
    tracing::info!(
        text = %config.text_model,
        multimodal = %config.multimodal_model,
        "using models"
    );
    Ok(Orchestrator::new(
        Arc::new(selector),
        Arc::new(FsContextLoader),
        sink,
        config.orchestrator_config(),
    ))
}
