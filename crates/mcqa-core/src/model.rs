//! Core data model types for mcqa.
//!
//! These are the types every stage of the pipeline passes around: the
//! question being asked, the context it is asked against, and the scored
//! responses that come back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::parser::DerivedItem;
use crate::randomizer::{clean_option, split_label};
use crate::statistics::mean;

/// The kind of supporting context a question is asked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Pdf,
    Image,
}

impl Modality {
    /// Whether this modality is answered by the multimodal backend.
    pub fn is_multimodal(self) -> bool {
        matches!(self, Modality::Image)
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Text => write!(f, "text"),
            Modality::Pdf => write!(f, "pdf"),
            Modality::Image => write!(f, "image"),
        }
    }
}

impl FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "txt" => Ok(Modality::Text),
            "pdf" => Ok(Modality::Pdf),
            "image" | "png" | "jpg" | "jpeg" => Ok(Modality::Image),
            other => Err(format!("unknown modality: {other}")),
        }
    }
}

/// How a question is submitted: as-is, reworded, or used as a seed for new
/// questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionFormat {
    #[default]
    Raw,
    Rephrase,
    Synthetic,
}

impl QuestionFormat {
    /// Rephrase and synthetic questions fan out into derived raw questions.
    pub fn is_derived(self) -> bool {
        !matches!(self, QuestionFormat::Raw)
    }
}

impl fmt::Display for QuestionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionFormat::Raw => write!(f, "raw"),
            QuestionFormat::Rephrase => write!(f, "rephrase"),
            QuestionFormat::Synthetic => write!(f, "synthetic"),
        }
    }
}

impl FromStr for QuestionFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "raw" => Ok(QuestionFormat::Raw),
            "rephrase" => Ok(QuestionFormat::Rephrase),
            "synthetic" => Ok(QuestionFormat::Synthetic),
            other => Err(format!("unknown question format: {other}")),
        }
    }
}

/// Where the supporting context for a question comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDescriptor {
    /// Kind of context.
    pub modality: Modality,
    /// Inline text or a path to a text file for `text`, a file path otherwise.
    pub link_or_text: String,
}

impl ContextDescriptor {
    pub fn new(modality: Modality, link_or_text: impl Into<String>) -> Self {
        Self {
            modality,
            link_or_text: link_or_text.into(),
        }
    }
}

/// A multiple-choice question together with its ground truth and context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// The question text.
    pub query: String,
    /// Answer options, in the order they were given.
    pub options: Vec<String>,
    /// The correct option's text.
    pub answer: String,
    /// How the question should be submitted.
    #[serde(default)]
    pub question_format: QuestionFormat,
    /// Supporting context.
    pub context: ContextDescriptor,
    /// Optional short context rendered next to the question.
    #[serde(default)]
    pub short_context: Option<String>,
}

impl Question {
    /// Build a raw question from an item derived by a rephrase/synthetic call.
    ///
    /// The derived question inherits the parent's context and short context.
    /// A bare label answer such as `"B"` is resolved to the option carrying
    /// that label so it can be looked up in the answer key.
    pub fn derived(item: DerivedItem, parent: &Question) -> Self {
        let answer = resolve_label_answer(&item.answer, &item.options);
        Self {
            query: item.question,
            options: item.options,
            answer,
            question_format: QuestionFormat::Raw,
            context: parent.context.clone(),
            short_context: parent.short_context.clone(),
        }
    }
}

fn resolve_label_answer(answer: &str, options: &[String]) -> String {
    let trimmed = answer.trim().trim_end_matches(['.', ')']);
    let mut chars = trimmed.chars();
    if let (Some(letter), None) = (chars.next(), chars.next()) {
        if letter.is_ascii_alphabetic() {
            let letter = letter.to_ascii_uppercase();
            if let Some(option) = options
                .iter()
                .find(|o| split_label(o).0 == Some(letter))
            {
                return clean_option(option);
            }
        }
    }
    answer.trim().to_string()
}

/// The scored result of answering one raw question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResponse {
    /// Answer extracted from the model reply.
    pub generated_answer: String,
    /// The relabelled ground-truth answer.
    pub actual_answer: String,
    /// The question text.
    pub question: String,
    /// Options as rendered into the prompt.
    pub options: String,
    /// Score in [0, 1].
    pub evaluation: f64,
    /// Excerpts the model cited from the context.
    pub excerpts: String,
    /// The model's reasoning trace.
    pub reasoning_trace: String,
    /// Whether the model answered from foundational knowledge.
    pub foundational_knowledge: String,
    /// Model that produced the reply.
    pub model_identifier: String,
}

/// The responses to every derived question of a rephrase/synthetic request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResponse {
    pub list_of_responses: Vec<QuestionResponse>,
    /// Mean of the member evaluations.
    pub evaluation: f64,
}

impl AggregateResponse {
    /// Aggregate a list of responses; `None` when the list is empty, since
    /// the mean is undefined.
    pub fn from_responses(list_of_responses: Vec<QuestionResponse>) -> Option<Self> {
        let scores: Vec<f64> = list_of_responses.iter().map(|r| r.evaluation).collect();
        let evaluation = mean(&scores)?;
        Some(Self {
            list_of_responses,
            evaluation,
        })
    }
}

/// What one top-level question produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Single(QuestionResponse),
    Aggregate(AggregateResponse),
}

impl Outcome {
    /// The overall score of this outcome.
    pub fn evaluation(&self) -> f64 {
        match self {
            Outcome::Single(r) => r.evaluation,
            Outcome::Aggregate(a) => a.evaluation,
        }
    }

    /// Every question response, with aggregates flattened.
    pub fn responses(&self) -> &[QuestionResponse] {
        match self {
            Outcome::Single(r) => std::slice::from_ref(r),
            Outcome::Aggregate(a) => &a.list_of_responses,
        }
    }

    pub fn into_responses(self) -> Vec<QuestionResponse> {
        match self {
            Outcome::Single(r) => vec![r],
            Outcome::Aggregate(a) => a.list_of_responses,
        }
    }
}
