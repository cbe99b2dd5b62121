//! Prompt construction.
//!
//! Which prompt a question gets depends on both its context modality and
//! its submission format. That matrix is resolved once into a
//! [`PromptKind`]; everything downstream matches on the kind.

use std::path::Path;
use std::sync::Arc;

use crate::context::{Attachment, ContextLoader};
use crate::error::McqaError;
use crate::model::{ContextDescriptor, Modality, QuestionFormat};
use crate::templates::{self, case};

/// The prompt shape for one (modality, format) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Answer against text or PDF context.
    TextAnswer,
    /// Answer against an attached image.
    ImageAnswer,
    /// Reword the question; no context is sent.
    Rephrase,
    /// Write new questions from text or PDF context.
    TextSynthetic,
    /// Write new questions from an attached image.
    ImageSynthetic,
}

impl PromptKind {
    pub fn resolve(modality: Modality, format: QuestionFormat) -> Self {
        match (modality, format) {
            (_, QuestionFormat::Rephrase) => PromptKind::Rephrase,
            (Modality::Text | Modality::Pdf, QuestionFormat::Raw) => PromptKind::TextAnswer,
            (Modality::Image, QuestionFormat::Raw) => PromptKind::ImageAnswer,
            (Modality::Text | Modality::Pdf, QuestionFormat::Synthetic) => {
                PromptKind::TextSynthetic
            }
            (Modality::Image, QuestionFormat::Synthetic) => PromptKind::ImageSynthetic,
        }
    }

    pub fn system_prompt(self) -> &'static str {
        match self {
            PromptKind::TextAnswer => templates::TEXT_SYSTEM_PROMPT,
            PromptKind::ImageAnswer => templates::MULTIMODAL_SYSTEM_PROMPT,
            PromptKind::Rephrase => templates::REPHRASE_SYSTEM_PROMPT,
            PromptKind::TextSynthetic => templates::SYNTHETIC_SYSTEM_PROMPT,
            PromptKind::ImageSynthetic => templates::MULTIMODAL_SYNTHETIC_SYSTEM_PROMPT,
        }
    }
}

/// Everything needed to build one prompt.
#[derive(Debug, Clone)]
pub struct CraftRequest<'a> {
    pub query: &'a str,
    /// Rendered, relabelled options.
    pub options: &'a str,
    /// Relabelled ground-truth answer.
    pub answer: &'a str,
    pub question_format: QuestionFormat,
    pub context: &'a ContextDescriptor,
    pub short_context: Option<&'a str>,
}

/// A ready-to-send prompt pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CraftedPrompt {
    pub kind: PromptKind,
    pub system_prompt: String,
    pub user_prompt: String,
    pub attachment: Option<Attachment>,
}

/// Builds prompts, loading context through a [`ContextLoader`].
pub struct PromptCrafter {
    loader: Arc<dyn ContextLoader>,
    synthetic_count: usize,
}

impl PromptCrafter {
    pub fn new(loader: Arc<dyn ContextLoader>, synthetic_count: usize) -> Self {
        Self {
            loader,
            synthetic_count,
        }
    }

    fn context_text(&self, context: &ContextDescriptor) -> Result<String, McqaError> {
        match context.modality {
            Modality::Pdf => self.loader.pdf_text(Path::new(&context.link_or_text)),
            _ => self.loader.text(&context.link_or_text),
        }
    }

    fn image(&self, context: &ContextDescriptor) -> Result<Attachment, McqaError> {
        self.loader.image(Path::new(&context.link_or_text))
    }

    pub fn craft(&self, request: &CraftRequest<'_>) -> Result<CraftedPrompt, McqaError> {
        let kind = PromptKind::resolve(request.context.modality, request.question_format);

        let question = templates::question_segment(request.query);
        let options = templates::options_segment(request.options);
        let answer = templates::answer_segment(request.answer);
        let short_context = templates::short_context_segment(request.short_context);
        let count = templates::number_of_questions_segment(self.synthetic_count);

        let (user_prompt, attachment) = match kind {
            PromptKind::TextAnswer => {
                let context = templates::context_segment(&self.context_text(request.context)?);
                (case(&[&question, &options, &context, &short_context]), None)
            }
            PromptKind::ImageAnswer => {
                let image = self.image(request.context)?;
                (case(&[&question, &options, &short_context]), Some(image))
            }
            PromptKind::Rephrase => (case(&[&question, &options, &answer]), None),
            PromptKind::TextSynthetic => {
                let context = templates::context_segment(&self.context_text(request.context)?);
                let prompt = case(&[&count, &question, &options, &answer, &context, &short_context]);
                (prompt, None)
            }
            PromptKind::ImageSynthetic => {
                let image = self.image(request.context)?;
                let prompt = case(&[&count, &question, &options, &answer, &short_context]);
                (prompt, Some(image))
            }
        };

        tracing::debug!(?kind, "crafted prompt:\n{user_prompt}");

        Ok(CraftedPrompt {
            kind,
            system_prompt: kind.system_prompt().to_string(),
            user_prompt,
            attachment,
        })
    }
}
