//! Question orchestrator.
//!
//! Routes a question through option randomization, prompt construction, the
//! model backend, reply parsing and scoring. Rephrase and synthetic
//! questions fan out once: every derived item is answered as a raw question
//! and the results are aggregated.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::context::ContextLoader;
use crate::error::{McqaError, ProviderError};
use crate::evaluator::{Evaluator, LabelMatch};
use crate::model::{AggregateResponse, Modality, Outcome, Question, QuestionFormat, QuestionResponse};
use crate::output::{FailureRecord, OutputSink, RequestRecord};
use crate::parser::{parse_derived, parse_reply};
use crate::prompt::{CraftRequest, CraftedPrompt, PromptCrafter};
use crate::randomizer::{sequential, AnswerKey, OptionRandomizer};
use crate::traits::{BackendSelector, GenerateRequest, GenerateResponse};

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Shuffle and relabel options before every prompt.
    pub randomize_options: bool,
    /// Questions requested from a synthetic prompt.
    pub synthetic_count: usize,
    /// Max tokens for generation.
    pub max_tokens: u32,
    /// Temperature for generation.
    pub temperature: f64,
    /// Retries on transient backend errors.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            randomize_options: true,
            synthetic_count: 5,
            max_tokens: 4096,
            temperature: 0.01,
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Answers and scores questions.
pub struct Orchestrator {
    backends: Arc<dyn BackendSelector>,
    crafter: PromptCrafter,
    sink: Arc<dyn OutputSink>,
    evaluator: Arc<dyn Evaluator>,
    randomizer: OptionRandomizer,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        backends: Arc<dyn BackendSelector>,
        loader: Arc<dyn ContextLoader>,
        sink: Arc<dyn OutputSink>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            backends,
            crafter: PromptCrafter::new(loader, config.synthetic_count),
            sink,
            evaluator: Arc::new(LabelMatch),
            randomizer: OptionRandomizer::new(),
            config,
        }
    }

    /// Score answers with a custom evaluator.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Use a reproducible option randomizer.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.randomizer = OptionRandomizer::with_seed(seed);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Evaluate a question and record the outcome in the output sink.
    ///
    /// A failing sink is logged and does not fail the request.
    #[tracing::instrument(skip_all, fields(format = %question.question_format, modality = %question.context.modality))]
    pub async fn run(&self, question: &Question) -> Result<Outcome> {
        match self.evaluate(question).await {
            Ok(outcome) => {
                let record = RequestRecord::new(question.clone(), outcome.clone());
                if let Err(e) = self.sink.record_success(&record) {
                    tracing::warn!("failed to record outcome {}: {e:#}", record.id);
                }
                Ok(outcome)
            }
            Err(e) => {
                let record = FailureRecord::new(question.clone(), &e);
                if let Err(sink_err) = self.sink.record_failure(&record) {
                    tracing::warn!("failed to record failure {}: {sink_err:#}", record.id);
                }
                Err(e)
            }
        }
    }

    /// Evaluate a question without recording it.
    pub async fn evaluate(&self, question: &Question) -> Result<Outcome> {
        match question.question_format {
            QuestionFormat::Raw => Ok(Outcome::Single(self.answer_raw(question).await?)),
            QuestionFormat::Rephrase | QuestionFormat::Synthetic => {
                Ok(Outcome::Aggregate(self.expand(question).await?))
            }
        }
    }

    fn answer_key(&self, options: &[String]) -> Result<AnswerKey, McqaError> {
        if self.config.randomize_options {
            self.randomizer.randomize(options)
        } else {
            sequential(options)
        }
    }

    async fn answer_raw(&self, question: &Question) -> Result<QuestionResponse> {
        let key = self.answer_key(&question.options)?;
        let actual_answer = key.relabel(&question.answer)?.to_string();
        let options = key.render();

        let prompt = self.crafter.craft(&CraftRequest {
            query: &question.query,
            options: &options,
            answer: &actual_answer,
            question_format: QuestionFormat::Raw,
            context: &question.context,
            short_context: question.short_context.as_deref(),
        })?;

        let response = self.generate(question.context.modality, prompt).await?;
        let parsed = parse_reply(&response.content);
        let evaluation = self.evaluator.evaluate(&parsed.answer, &actual_answer);
        tracing::debug!(evaluation, "'{}' vs '{actual_answer}'", parsed.answer);

        Ok(QuestionResponse {
            generated_answer: parsed.answer,
            actual_answer,
            question: question.query.clone(),
            options,
            evaluation,
            excerpts: parsed.excerpts,
            reasoning_trace: parsed.reasoning_trace,
            foundational_knowledge: parsed.foundational_knowledge,
            model_identifier: response.model,
        })
    }

    async fn expand(&self, question: &Question) -> Result<AggregateResponse> {
        let key = self.answer_key(&question.options)?;
        let answer = key.relabel(&question.answer)?.to_string();
        let options = key.render();

        let prompt = self.crafter.craft(&CraftRequest {
            query: &question.query,
            options: &options,
            answer: &answer,
            question_format: question.question_format,
            context: &question.context,
            short_context: question.short_context.as_deref(),
        })?;

        let response = self.generate(question.context.modality, prompt).await?;
        let items = parse_derived(&response.content);
        let attempted = items.len();
        tracing::info!(
            "{} request produced {attempted} derived question(s)",
            question.question_format
        );

        let mut responses = Vec::with_capacity(attempted);
        for (i, item) in items.into_iter().enumerate() {
            let derived = Question::derived(item, question);
            match self.answer_raw(&derived).await {
                Ok(r) => responses.push(r),
                Err(e) => {
                    tracing::error!("derived question {}/{attempted} failed: {e:#}", i + 1);
                }
            }
        }

        AggregateResponse::from_responses(responses).ok_or_else(|| {
            McqaError::NoViableDerivedResponses {
                format: question.question_format,
                attempted,
            }
            .into()
        })
    }

    async fn generate(&self, modality: Modality, prompt: CraftedPrompt) -> Result<GenerateResponse> {
        let route = self
            .backends
            .select(modality)
            .with_context(|| format!("no backend for {modality} context"))?;
        let backend = &route.backend;
        backend
            .start()
            .await
            .with_context(|| format!("failed to start backend '{}'", backend.name()))?;

        let request = GenerateRequest {
            model: route.model.clone(),
            system_prompt: prompt.system_prompt,
            user_prompt: prompt.user_prompt,
            attachment: prompt.attachment,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        // Retry transient backend errors with exponential backoff
        let start = Instant::now();
        let mut last_error = None;
        let mut retry_delay = self.config.retry_delay;
        for retry in 0..=self.config.max_retries {
            if retry > 0 {
                tokio::time::sleep(retry_delay).await;
                retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
            }
            match backend.generate(&request).await {
                Ok(response) => {
                    tracing::debug!(
                        backend = backend.name(),
                        model = %response.model,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "reply:\n{}",
                        response.content
                    );
                    return Ok(response);
                }
                Err(e) => {
                    if let Some(provider_err) = e.downcast_ref::<ProviderError>() {
                        if provider_err.is_permanent() {
                            return Err(e);
                        }
                        if let Some(ms) = provider_err.retry_after_ms() {
                            retry_delay = Duration::from_millis(ms).min(MAX_RETRY_DELAY);
                        }
                    }
                    tracing::warn!(
                        "backend '{}' attempt {} failed: {e:#}",
                        backend.name(),
                        retry + 1
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("backend returned no result")))
    }
}
