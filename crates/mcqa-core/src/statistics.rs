//! Score aggregation.

use serde::{Deserialize, Serialize};

use crate::model::QuestionResponse;

/// Arithmetic mean, or `None` for an empty slice (never NaN).
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Summary of a set of scored responses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    /// Number of responses.
    pub count: usize,
    /// Responses that scored a full 1.0.
    pub correct: usize,
    /// Mean evaluation (`None` when there are no responses).
    pub mean: Option<f64>,
}

impl ScoreSummary {
    pub fn from_responses(responses: &[QuestionResponse]) -> Self {
        let scores: Vec<f64> = responses.iter().map(|r| r.evaluation).collect();
        Self {
            count: scores.len(),
            correct: scores.iter().filter(|&&s| s >= 1.0).count(),
            mean: mean(&scores),
        }
    }

    /// Fraction of responses that were fully correct.
    pub fn accuracy(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.correct as f64 / self.count as f64
        }
    }
}
