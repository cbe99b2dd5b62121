//! Persistence of per-request outcomes.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Outcome, Question};

/// A top-level question that produced an outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub question: Question,
    pub outcome: Outcome,
}

impl RequestRecord {
    pub fn new(question: Question, outcome: Outcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            question,
            outcome,
        }
    }
}

/// A top-level question that failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub question: Question,
    /// The full error chain.
    pub error: String,
}

impl FailureRecord {
    pub fn new(question: Question, error: &anyhow::Error) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            question,
            error: format!("{error:#}"),
        }
    }
}

/// Where request outcomes are recorded.
pub trait OutputSink: Send + Sync {
    fn record_success(&self, record: &RequestRecord) -> Result<()>;
    fn record_failure(&self, record: &FailureRecord) -> Result<()>;
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl OutputSink for NoopSink {
    fn record_success(&self, _record: &RequestRecord) -> Result<()> {
        Ok(())
    }

    fn record_failure(&self, _record: &FailureRecord) -> Result<()> {
        Ok(())
    }
}

/// Writes one pretty-printed JSON file per record under
/// `<dir>/requests/` and `<dir>/failures/`.
#[derive(Debug, Clone)]
pub struct JsonDirSink {
    dir: PathBuf,
}

impl JsonDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn requests_dir(&self) -> PathBuf {
        self.dir.join("requests")
    }

    pub fn failures_dir(&self) -> PathBuf {
        self.dir.join("failures")
    }
}

impl OutputSink for JsonDirSink {
    fn record_success(&self, record: &RequestRecord) -> Result<()> {
        let path = self.requests_dir().join(format!("{}.json", record.id));
        write_json(record, &path)
    }

    fn record_failure(&self, record: &FailureRecord) -> Result<()> {
        let path = self.failures_dir().join(format!("{}.json", record.id));
        write_json(record, &path)
    }
}

/// Serialize `value` as pretty JSON to `path`, creating parent directories.
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize record")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::debug!("wrote {}", path.display());
    Ok(())
}
