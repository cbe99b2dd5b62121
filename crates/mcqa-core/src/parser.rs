//! Model reply parser.
//!
//! Replies are expected to follow the tag layout requested in the system
//! prompts, but models drift, so extraction never fails: a missing answer
//! tag yields a placeholder and a short derived list is truncated.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::randomizer::split_labelled_options;

/// Placeholder used when a reply has no `<Answer>` tag.
pub const ANSWER_PLACEHOLDER: &str = "Answer";
/// Placeholder used when a reply has no `<RelevantExcerpts>` tag.
pub const EXCERPTS_PLACEHOLDER: &str = "RelevantExcerpts";
/// Placeholder used when a reply has no `<Thinking>` tag.
pub const THINKING_PLACEHOLDER: &str = "Thinking";
/// Placeholder used when a reply has no `<FoundationalKnowledge>` tag.
pub const FOUNDATIONAL_KNOWLEDGE_PLACEHOLDER: &str = "FoundationalKnowledge";

/// The fields of an answer reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedReply {
    pub answer: String,
    pub excerpts: String,
    pub reasoning_trace: String,
    pub foundational_knowledge: String,
}

/// One question produced by a rephrase or synthetic request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedItem {
    pub question: String,
    /// Options with their labels, e.g. `"A. Ibuprofen"`.
    pub options: Vec<String>,
    pub answer: String,
}

macro_rules! tag_regex {
    ($name:ident, $tag:literal) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| {
                Regex::new(concat!(r"(?s)<", $tag, r">\s*(.*?)\s*</", $tag, ">"))
                    .expect("valid tag regex")
            })
        }
    };
}

tag_regex!(answer_re, "Answer");
tag_regex!(excerpts_re, "RelevantExcerpts");
tag_regex!(thinking_re, "Thinking");
tag_regex!(foundational_re, "FoundationalKnowledge");
tag_regex!(question_re, "Question");
tag_regex!(options_re, "Options");

fn first(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn all(re: &Regex, text: &str) -> Vec<String> {
    re.captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Extract the answer fields from a reply. Each tag is read independently;
/// a missing tag yields its placeholder.
pub fn parse_reply(reply: &str) -> ParsedReply {
    ParsedReply {
        answer: first(answer_re(), reply).unwrap_or_else(|| ANSWER_PLACEHOLDER.into()),
        excerpts: first(excerpts_re(), reply).unwrap_or_else(|| EXCERPTS_PLACEHOLDER.into()),
        reasoning_trace: first(thinking_re(), reply)
            .unwrap_or_else(|| THINKING_PLACEHOLDER.into()),
        foundational_knowledge: first(foundational_re(), reply)
            .unwrap_or_else(|| FOUNDATIONAL_KNOWLEDGE_PLACEHOLDER.into()),
    }
}

/// Extract every (question, options, answer) triple from a rephrase or
/// synthetic reply, zipping the tags positionally.
pub fn parse_derived(reply: &str) -> Vec<DerivedItem> {
    let questions = all(question_re(), reply);
    let options = all(options_re(), reply);
    let answers = all(answer_re(), reply);

    if questions.len() != options.len() || options.len() != answers.len() {
        tracing::warn!(
            questions = questions.len(),
            options = options.len(),
            answers = answers.len(),
            "derived reply has unequal tag counts, truncating to the shortest"
        );
    }

    questions
        .into_iter()
        .zip(options)
        .zip(answers)
        .map(|((question, options), answer)| DerivedItem {
            question,
            options: split_labelled_options(&options),
            answer,
        })
        .collect()
}
