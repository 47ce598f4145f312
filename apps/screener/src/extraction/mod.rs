//! Document Extractor: turns an uploaded resume (PDF or DOCX) into plain text.
//!
//! Parsing is CPU-bound and some parsers panic on malformed input, so the work
//! runs inside `tokio::task::spawn_blocking`; a panicked parse surfaces as
//! `ExtractionError::CorruptDocument`.

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub mod docx;
pub mod pdf;

const PDF_MIME: &str = "application/pdf";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type '{0}'. Upload a PDF or DOCX resume.")]
    UnsupportedMediaType(String),

    #[error("Could not read {kind} document: {reason}")]
    CorruptDocument { kind: &'static str, reason: String },

    #[error("Could not extract text from the uploaded file. Try another format.")]
    NoText,
}

/// Media types the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Pdf,
    Docx,
}

impl MediaType {
    /// Recognises a declared MIME type, ignoring parameters such as `; charset=`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        if essence.eq_ignore_ascii_case(PDF_MIME) {
            Some(MediaType::Pdf)
        } else if essence.eq_ignore_ascii_case(DOCX_MIME) {
            Some(MediaType::Docx)
        } else {
            None
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(MediaType::Pdf),
            "docx" => Some(MediaType::Docx),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MediaType::Pdf => "PDF",
            MediaType::Docx => "DOCX",
        }
    }
}

/// Raw upload plus its resolved media type. Lives for one request only.
#[derive(Debug, Clone)]
pub struct ResumeDocument {
    pub bytes: Bytes,
    pub media_type: MediaType,
}

impl ResumeDocument {
    pub fn new(bytes: Bytes, media_type: MediaType) -> Self {
        Self { bytes, media_type }
    }

    /// Resolves the media type of an upload.
    ///
    /// The declared content type wins. When it is absent or the generic
    /// `application/octet-stream`, the file extension is consulted instead.
    /// Anything else is rejected rather than silently producing no text.
    pub fn from_upload(
        bytes: Bytes,
        content_type: Option<&str>,
        file_name: Option<&str>,
    ) -> Result<Self, ExtractionError> {
        if let Some(media_type) = content_type.and_then(MediaType::from_mime) {
            return Ok(Self::new(bytes, media_type));
        }

        let generic = content_type
            .map(|ct| ct.trim().is_empty() || ct.starts_with("application/octet-stream"))
            .unwrap_or(true);

        if generic {
            if let Some(media_type) = file_name.and_then(MediaType::from_file_name) {
                return Ok(Self::new(bytes, media_type));
            }
        }

        let declared = content_type
            .filter(|ct| !ct.trim().is_empty())
            .or(file_name)
            .unwrap_or("unknown");
        Err(ExtractionError::UnsupportedMediaType(declared.to_string()))
    }
}

/// Extracts plain text from the document on the blocking pool.
pub async fn extract_text(document: ResumeDocument) -> Result<String, ExtractionError> {
    let kind = document.media_type.label();

    let text = tokio::task::spawn_blocking(move || extract_text_sync(&document))
        .await
        .map_err(|e| ExtractionError::CorruptDocument {
            kind,
            reason: format!("parser aborted: {e}"),
        })??;

    if text.trim().is_empty() {
        return Err(ExtractionError::NoText);
    }

    debug!("Extracted {} chars from {} resume", text.len(), kind);
    Ok(text)
}

fn extract_text_sync(document: &ResumeDocument) -> Result<String, ExtractionError> {
    match document.media_type {
        MediaType::Pdf => pdf::extract(&document.bytes),
        MediaType::Docx => docx::extract(&document.bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mime_recognises_both_types() {
        assert_eq!(MediaType::from_mime("application/pdf"), Some(MediaType::Pdf));
        assert_eq!(MediaType::from_mime(DOCX_MIME), Some(MediaType::Docx));
        assert_eq!(
            MediaType::from_mime("Application/PDF; charset=binary"),
            Some(MediaType::Pdf)
        );
        assert_eq!(MediaType::from_mime("application/msword"), None);
        assert_eq!(MediaType::from_mime("text/plain"), None);
    }

    #[test]
    fn test_from_file_name() {
        assert_eq!(MediaType::from_file_name("cv.PDF"), Some(MediaType::Pdf));
        assert_eq!(MediaType::from_file_name("jane.doe.docx"), Some(MediaType::Docx));
        assert_eq!(MediaType::from_file_name("resume.doc"), None);
        assert_eq!(MediaType::from_file_name("resume"), None);
    }

    #[test]
    fn test_from_upload_prefers_declared_type() {
        let doc = ResumeDocument::from_upload(
            Bytes::from_static(b"x"),
            Some("application/pdf"),
            Some("resume.docx"),
        )
        .unwrap();
        assert_eq!(doc.media_type, MediaType::Pdf);
    }

    #[test]
    fn test_from_upload_falls_back_to_extension_for_octet_stream() {
        let doc = ResumeDocument::from_upload(
            Bytes::from_static(b"x"),
            Some("application/octet-stream"),
            Some("resume.docx"),
        )
        .unwrap();
        assert_eq!(doc.media_type, MediaType::Docx);
    }

    #[test]
    fn test_from_upload_rejects_unsupported_type() {
        let err = ResumeDocument::from_upload(
            Bytes::from_static(b"hello"),
            Some("text/plain"),
            Some("resume.pdf"),
        )
        .unwrap_err();
        match err {
            ExtractionError::UnsupportedMediaType(t) => assert_eq!(t, "text/plain"),
            other => panic!("expected UnsupportedMediaType, got {other:?}"),
        }
    }

    #[test]
    fn test_from_upload_rejects_unknown_extension_without_type() {
        let err =
            ResumeDocument::from_upload(Bytes::from_static(b"x"), None, Some("resume.odt"))
                .unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedMediaType(ref t) if t == "resume.odt"));
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_an_extraction_error() {
        let doc = ResumeDocument::new(Bytes::from_static(b"definitely not a pdf"), MediaType::Pdf);
        let err = extract_text(doc).await.unwrap_err();
        assert!(matches!(err, ExtractionError::CorruptDocument { kind: "PDF", .. }));
    }

    #[tokio::test]
    async fn test_corrupt_docx_is_an_extraction_error() {
        let doc = ResumeDocument::new(Bytes::from_static(b"PK not a zip"), MediaType::Docx);
        let err = extract_text(doc).await.unwrap_err();
        assert!(matches!(err, ExtractionError::CorruptDocument { kind: "DOCX", .. }));
    }

    #[tokio::test]
    async fn test_docx_round_trip_through_async_extractor() {
        let bytes = docx::tests::build_docx(&["Jane Doe", "Rust engineer, 6 years"]);
        let doc = ResumeDocument::new(Bytes::from(bytes), MediaType::Docx);
        let text = extract_text(doc).await.unwrap();
        assert!(text.contains("Jane Doe"));
        assert!(text.contains("Rust engineer, 6 years"));
    }

    #[tokio::test]
    async fn test_multi_page_pdf_through_async_extractor() {
        let bytes = pdf::tests::build_pdf(&["Alpha", "", "Gamma"]);
        let doc = ResumeDocument::new(Bytes::from(bytes), MediaType::Pdf);
        let text = extract_text(doc).await.unwrap();
        assert!(text.find("Alpha").unwrap() < text.find("Gamma").unwrap());
    }

    #[tokio::test]
    async fn test_textless_pdf_reports_no_text() {
        let bytes = pdf::tests::build_pdf(&["", ""]);
        let doc = ResumeDocument::new(Bytes::from(bytes), MediaType::Pdf);
        let err = extract_text(doc).await.unwrap_err();
        assert!(matches!(err, ExtractionError::NoText));
    }

    #[tokio::test]
    async fn test_blank_docx_reports_no_text() {
        let bytes = docx::tests::build_docx(&["   ", ""]);
        let doc = ResumeDocument::new(Bytes::from(bytes), MediaType::Docx);
        let err = extract_text(doc).await.unwrap_err();
        assert!(matches!(err, ExtractionError::NoText));
    }
}
