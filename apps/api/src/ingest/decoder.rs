//! Document decoder: turns an uploaded PDF into plain text.
//!
//! Exactly one binary format is supported. A stream that parses but yields
//! no visible characters is a `CorruptDocument`, never an empty success.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;

/// How far into the stream the `%PDF-` signature may appear.
const SIGNATURE_WINDOW: usize = 1024;
const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// The supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Pdf,
}

impl ContentType {
    /// Parses a declared MIME type. Parameters (`; charset=...`) are ignored.
    pub fn parse(declared: &str) -> Result<Self, AppError> {
        let essence = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" | "application/x-pdf" => Ok(ContentType::Pdf),
            "" => Err(AppError::UnsupportedFormat(
                "no content type declared; upload a PDF".to_string(),
            )),
            other => Err(AppError::UnsupportedFormat(format!(
                "'{other}' is not supported; upload a PDF"
            ))),
        }
    }
}

/// An uploaded document. Lives only for the request that received it.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub bytes: Bytes,
    pub content_type: String,
    pub declared_size: usize,
    pub owner: String,
}

impl Document {
    pub fn new(bytes: Bytes, content_type: impl Into<String>, owner: impl Into<String>) -> Self {
        let declared_size = bytes.len();
        Self {
            id: Uuid::new_v4(),
            bytes,
            content_type: content_type.into(),
            declared_size,
            owner: owner.into(),
        }
    }
}

/// Plain text recovered from a document. `content` is never empty.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedText {
    pub document_id: Uuid,
    pub content: String,
    pub extracted_at: DateTime<Utc>,
}

impl ExtractedText {
    /// Wraps text that arrived as text (no document), e.g. a JSON request body.
    pub fn from_plain(content: &str) -> Result<Self, AppError> {
        if content.trim().is_empty() {
            return Err(AppError::Validation("resume_text cannot be empty".to_string()));
        }
        Ok(Self {
            document_id: Uuid::new_v4(),
            content: content.to_string(),
            extracted_at: Utc::now(),
        })
    }
}

/// Decodes `bytes` declared as `declared_content_type` into text.
pub fn decode(bytes: &[u8], declared_content_type: &str) -> Result<String, AppError> {
    let content_type = ContentType::parse(declared_content_type)?;

    if bytes.is_empty() {
        return Err(AppError::CorruptDocument("document is empty".to_string()));
    }

    match content_type {
        ContentType::Pdf => decode_pdf(bytes),
    }
}

fn decode_pdf(bytes: &[u8]) -> Result<String, AppError> {
    if !has_pdf_signature(bytes) {
        return Err(AppError::CorruptDocument(
            "missing PDF header; the file is not a PDF".to_string(),
        ));
    }

    // The parser panics on some malformed streams; contain it here.
    let parsed = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(bytes)
    }))
    .map_err(|_| AppError::CorruptDocument("PDF parser aborted on malformed input".to_string()))?;

    let text = parsed
        .map_err(|e| AppError::CorruptDocument(format!("failed to parse PDF: {e}")))?;

    if text.trim().is_empty() {
        return Err(AppError::CorruptDocument(
            "PDF contains no extractable text (scanned image?)".to_string(),
        ));
    }

    debug!("Decoded PDF: {} bytes -> {} chars", bytes.len(), text.chars().count());
    Ok(text)
}

fn has_pdf_signature(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(SIGNATURE_WINDOW)];
    window
        .windows(PDF_SIGNATURE.len())
        .any(|w| w == PDF_SIGNATURE)
}

/// Decodes a document on the blocking pool, bounded by `timeout`.
pub async fn decode_document(
    document: Document,
    timeout: Duration,
) -> Result<ExtractedText, AppError> {
    let document_id = document.id;
    let size = document.declared_size;
    let owner = document.owner.clone();
    let task = tokio::task::spawn_blocking(move || {
        decode(&document.bytes, &document.content_type)
    });

    let content = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(join_err)) => {
            warn!(owner = %owner, "Decoder task for document {document_id} failed: {join_err}");
            return Err(AppError::CorruptDocument(
                "document could not be decoded".to_string(),
            ));
        }
        Err(_) => {
            warn!(
                owner = %owner,
                "Decoding document {document_id} ({size} bytes) exceeded {}s",
                timeout.as_secs()
            );
            return Err(AppError::CorruptDocument(format!(
                "decoding did not finish within {}s",
                timeout.as_secs()
            )));
        }
    };

    Ok(ExtractedText {
        document_id,
        content,
        extracted_at: Utc::now(),
    })
}
