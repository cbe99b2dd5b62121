//! Loading question context from disk.
//!
//! The prompt crafter only talks to the [`ContextLoader`] trait; the
//! filesystem implementation extracts PDF text and base64-encodes images.

use std::path::Path;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::McqaError;

/// A binary payload sent alongside the prompts (currently always an image).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// MIME type, e.g. `image/png`.
    pub media_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

impl Attachment {
    /// `data:` URL form used by OpenAI-compatible APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// Resolves a context descriptor's `link_or_text` into prompt material.
pub trait ContextLoader: Send + Sync {
    /// Text context: the contents of the named file, or the string itself
    /// when it does not name a file.
    fn text(&self, link_or_text: &str) -> Result<String, McqaError>;

    /// Extract the text of a PDF.
    fn pdf_text(&self, path: &Path) -> Result<String, McqaError>;

    /// Read and encode an image.
    fn image(&self, path: &Path) -> Result<Attachment, McqaError>;
}

/// Loads context from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsContextLoader;

fn context_error(path: &Path, message: impl ToString) -> McqaError {
    McqaError::ContextLoad {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// Infer an image MIME type from its extension.
pub fn image_media_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

impl ContextLoader for FsContextLoader {
    fn text(&self, link_or_text: &str) -> Result<String, McqaError> {
        let path = Path::new(link_or_text);
        if !link_or_text.contains('\n') && path.is_file() {
            return std::fs::read_to_string(path).map_err(|e| context_error(path, e));
        }
        Ok(link_or_text.to_string())
    }

    fn pdf_text(&self, path: &Path) -> Result<String, McqaError> {
        tracing::debug!("extracting text from {}", path.display());
        pdf_extract::extract_text(path).map_err(|e| context_error(path, e))
    }

    fn image(&self, path: &Path) -> Result<Attachment, McqaError> {
        let bytes = std::fs::read(path).map_err(|e| context_error(path, e))?;
        Ok(Attachment {
            media_type: image_media_type(path).to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_text_passes_through() {
        let text = FsContextLoader
            .text("Penicillin is a beta-lactam antibiotic.")
            .unwrap();
        assert_eq!(text, "Penicillin is a beta-lactam antibiotic.");
    }

    #[test]
    fn text_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.txt");
        std::fs::write(&path, "from a file").unwrap();
        let text = FsContextLoader.text(path.to_str().unwrap()).unwrap();
        assert_eq!(text, "from a file");
    }

    #[test]
    fn image_is_base64_encoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.JPG");
        std::fs::write(&path, b"abc").unwrap();
        let attachment = FsContextLoader.image(&path).unwrap();
        assert_eq!(attachment.media_type, "image/jpeg");
        assert_eq!(attachment.data, "YWJj");
        assert_eq!(attachment.data_url(), "data:image/jpeg;base64,YWJj");
    }

    #[test]
    fn missing_image_is_context_error() {
        let err = FsContextLoader
            .image(Path::new("/nonexistent/scan.png"))
            .unwrap_err();
        assert!(matches!(err, McqaError::ContextLoad { .. }));
        assert!(err.to_string().contains("/nonexistent/scan.png"));
    }

    #[test]
    fn missing_pdf_is_context_error() {
        let err = FsContextLoader
            .pdf_text(Path::new("/nonexistent/paper.pdf"))
            .unwrap_err();
        assert!(matches!(err, McqaError::ContextLoad { .. }));
    }

    #[test]
    fn media_type_defaults_to_png() {
        assert_eq!(image_media_type(Path::new("x.webp")), "image/webp");
        assert_eq!(image_media_type(Path::new("x")), "image/png");
    }
}
