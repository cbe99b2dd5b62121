//! Batch driver over loaded CSV rows.
//!
//! Rows are answered one after another with a fixed pause between them. A
//! failing row is reported and skipped; the batch only fails when no row
//! produced anything.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::McqaError;
use crate::loader::SourceRow;
use crate::model::{Outcome, QuestionFormat, QuestionResponse};
use crate::orchestrator::Orchestrator;
use crate::output::write_json;
use crate::statistics::ScoreSummary;

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_row_start(&self, index: usize, total: usize, query: &str);
    fn on_row_complete(&self, index: usize, outcome: &Outcome);
    fn on_row_error(&self, index: usize, error: &str);
    fn on_batch_complete(&self, total: usize, failed: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_row_start(&self, _: usize, _: usize, _: &str) {}
    fn on_row_complete(&self, _: usize, _: &Outcome) {}
    fn on_row_error(&self, _: usize, _: &str) {}
    fn on_batch_complete(&self, _: usize, _: usize, _: Duration) {}
}

/// The result of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    pub question_format: QuestionFormat,
    pub rows_total: usize,
    pub rows_failed: usize,
    /// Every question response, aggregates flattened.
    pub responses: Vec<QuestionResponse>,
    /// Mean evaluation over `responses`.
    pub evaluation: f64,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn summary(&self) -> ScoreSummary {
        ScoreSummary::from_responses(&self.responses)
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        write_json(self, path).with_context(|| format!("failed to save report {}", self.id))
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: BatchReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}

/// Runs every row of a question file through the orchestrator.
pub struct BatchDriver {
    orchestrator: Arc<Orchestrator>,
    request_delay: Duration,
}

impl BatchDriver {
    pub fn new(orchestrator: Arc<Orchestrator>, request_delay: Duration) -> Self {
        Self {
            orchestrator,
            request_delay,
        }
    }

    pub async fn run(
        &self,
        rows: Vec<SourceRow>,
        question_format: QuestionFormat,
        progress: &dyn ProgressReporter,
    ) -> Result<BatchReport> {
        let start = Instant::now();
        let total = rows.len();
        let mut responses = Vec::new();
        let mut failed = 0usize;

        for (index, row) in rows.into_iter().enumerate() {
            if index > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            let question = row.into_question(question_format);
            progress.on_row_start(index, total, &question.query);

            match self.orchestrator.run(&question).await {
                Ok(outcome) => {
                    progress.on_row_complete(index, &outcome);
                    responses.extend(outcome.into_responses());
                }
                Err(e) => {
                    tracing::error!("row {} failed: {e:#}", index + 1);
                    progress.on_row_error(index, &format!("{e:#}"));
                    failed += 1;
                }
            }
        }

        let elapsed = start.elapsed();
        progress.on_batch_complete(total, failed, elapsed);

        let summary = ScoreSummary::from_responses(&responses);
        let evaluation = summary
            .mean
            .ok_or(McqaError::NoSuccessfulRows { total, failed })?;
        tracing::info!(
            rows = total,
            failed,
            responses = summary.count,
            "batch finished with mean evaluation {evaluation:.3}"
        );

        Ok(BatchReport {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            question_format,
            rows_total: total,
            rows_failed: failed,
            responses,
            evaluation,
            duration_ms: elapsed.as_millis() as u64,
        })
    }
}
