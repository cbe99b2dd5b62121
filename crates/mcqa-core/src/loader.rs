//! CSV question loader.
//!
//! Loads question rows from a CSV export and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{ContextDescriptor, Modality, Question, QuestionFormat};
use crate::randomizer::{clean_option, split_labelled_options, MAX_OPTIONS};

const ZERO_WIDTH_SPACE: char = '\u{200b}';

/// Raw CSV record, keyed by the export's column headers.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(default)]
    source_path: Option<String>,
    #[serde(rename = "Question")]
    question: String,
    options: String,
    #[serde(rename = "Correct Answer")]
    correct_answer: String,
    #[serde(rename = "Short_Context?", default)]
    short_context: Option<String>,
    source_type: String,
}

/// One question row, ready to be turned into a [`Question`].
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub query: String,
    pub options: Vec<String>,
    pub answer: String,
    pub context: ContextDescriptor,
    pub short_context: Option<String>,
}

impl SourceRow {
    /// Build a top-level question submitted in the given format.
    pub fn into_question(self, question_format: QuestionFormat) -> Question {
        Question {
            query: self.query,
            options: self.options,
            answer: self.answer,
            question_format,
            context: self.context,
            short_context: self.short_context,
        }
    }
}

/// Position of the quote closing an item of a list literal: the first `quote`
/// followed by a comma or the end of the list. Apostrophes inside an item
/// (`Crohn's disease`) are not followed by either.
fn closing_quote(body: &str, quote: char) -> Option<usize> {
    body.match_indices(quote).map(|(i, _)| i).find(|&i| {
        let after = body[i + 1..].trim_start();
        after.is_empty() || after.starts_with(',')
    })
}

/// Items of a list literal such as `['A. x', "B. y's"]`, or `None` when the
/// cell is not one.
fn split_list_literal(cell: &str) -> Option<Vec<String>> {
    let mut rest = cell.trim().strip_prefix('[')?.strip_suffix(']')?.trim();
    let mut items = Vec::new();
    while !rest.is_empty() {
        let quote = rest.chars().next().filter(|c| matches!(c, '\'' | '"'))?;
        let body = &rest[1..];
        let end = closing_quote(body, quote)?;
        items.push(body[..end].trim().to_string());
        let after = body[end + 1..].trim_start();
        rest = after.strip_prefix(',').unwrap_or(after).trim_start();
    }
    Some(items)
}

/// Parse an options cell: either a list literal such as `['A. x', 'B. y']`
/// or a single labelled line such as `A. x B. y`.
pub fn parse_options_cell(cell: &str) -> Vec<String> {
    let cell = cell.replace(ZERO_WIDTH_SPACE, "");
    if let Some(items) = split_list_literal(&cell) {
        return items.into_iter().filter(|s| !s.is_empty()).collect();
    }

    let unbracketed = cell.trim().trim_start_matches('[').trim_end_matches(']');
    split_labelled_options(unbracketed)
}

/// Strip one pair of enclosing quotes, keeping apostrophes inside the text.
fn strip_enclosing_quotes(s: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return inner.trim();
        }
    }
    s
}

fn clean_answer(cell: &str) -> String {
    let cell = cell.replace(ZERO_WIDTH_SPACE, "");
    strip_enclosing_quotes(cell.trim()).to_string()
}

fn non_empty(cell: Option<String>) -> Option<String> {
    cell.map(|s| s.replace(ZERO_WIDTH_SPACE, "").trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Load every usable row of a question CSV file.
pub fn load_csv(path: &Path) -> Result<Vec<SourceRow>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question file: {}", path.display()))?;

    load_csv_str(&content, path)
}

/// Parse CSV content into rows (useful for testing).
pub fn load_csv_str(content: &str, source_path: &Path) -> Result<Vec<SourceRow>> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let mut rows = Vec::new();

    for (i, record) in reader.deserialize::<CsvRecord>().enumerate() {
        let line = i + 2;
        let record = record
            .with_context(|| format!("failed to parse CSV row {line}: {}", source_path.display()))?;

        let Some(link) = non_empty(record.source_path) else {
            tracing::debug!("row {line}: no source_path, skipping");
            continue;
        };
        let modality: Modality = match record.source_type.parse() {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("row {line}: {e}, skipping");
                continue;
            }
        };

        rows.push(SourceRow {
            query: record.question.replace(ZERO_WIDTH_SPACE, "").trim().to_string(),
            options: parse_options_cell(&record.options),
            answer: clean_answer(&record.correct_answer),
            context: ContextDescriptor::new(modality, link),
            short_context: non_empty(record.short_context),
        });
    }

    Ok(rows)
}

/// A warning from row validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// 1-based index of the row among loaded rows.
    pub row: usize,
    /// Warning message.
    pub message: String,
}

/// Validate loaded rows for common issues.
pub fn validate_rows(rows: &[SourceRow]) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        let mut warn = |message: String| {
            warnings.push(ValidationWarning {
                row: i + 1,
                message,
            })
        };

        if row.query.is_empty() {
            warn("question is empty".into());
        }
        if row.options.len() < 2 {
            warn(format!("only {} option(s)", row.options.len()));
        }
        if row.options.len() > MAX_OPTIONS {
            warn(format!(
                "{} options, at most {MAX_OPTIONS} can be labelled",
                row.options.len()
            ));
        }

        let cleaned: Vec<String> = row.options.iter().map(|o| clean_option(o)).collect();
        let mut seen = HashSet::new();
        for option in &cleaned {
            if !seen.insert(option) {
                warn(format!("duplicate option: {option}"));
            }
        }

        if !cleaned.contains(&clean_option(&row.answer)) {
            warn(format!("answer '{}' is not one of the options", row.answer));
        }
    }

    warnings
}
