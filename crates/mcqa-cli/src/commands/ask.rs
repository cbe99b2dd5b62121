//! The `mcqa ask` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use mcqa_core::model::{ContextDescriptor, Modality, Question, QuestionFormat};
use mcqa_core::output::JsonDirSink;
use mcqa_providers::config::load_config_from;

pub struct AskArgs {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    pub context_type: Modality,
    pub context: String,
    pub short_context: Option<String>,
    pub format: QuestionFormat,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: AskArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;

    let question = Question {
        query: args.question,
        options: args.options,
        answer: args.answer,
        question_format: args.format,
        context: ContextDescriptor::new(args.context_type, args.context),
        short_context: args.short_context.filter(|s| !s.trim().is_empty()),
    };

    let sink = Arc::new(JsonDirSink::new(&config.output_dir));
    let orchestrator = super::build_orchestrator(&config, sink)?;
    let outcome = orchestrator.run(&question).await?;

    let json = serde_json::to_string_pretty(&outcome).context("failed to serialize outcome")?;
    println!("{json}");

    Ok(())
}
