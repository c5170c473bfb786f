//! Multipart upload handlers.

use axum::{
    extract::{multipart::Field, Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::extraction::ExtractedFields;
use crate::ingest::decoder::{decode_document, Document};
use crate::ingest::pipeline::{ResumePipeline, ResumeUpload, UploadOutcome};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ParseResumeResponse {
    #[serde(flatten)]
    pub fields: ExtractedFields,
    pub text: String,
    pub extractor: &'static str,
}

/// A file part read fully into memory.
struct FilePart {
    bytes: Bytes,
    content_type: String,
}

/// The declared part type wins; a bare `.pdf` filename stands in when the
/// client sent none.
async fn read_file(field: Field<'_>) -> Result<FilePart, AppError> {
    let declared = field.content_type().map(str::to_string);
    let file_name = field.file_name().map(str::to_ascii_lowercase);
    let content_type = match (declared, file_name) {
        (Some(ct), _) if !ct.is_empty() && ct != "application/octet-stream" => ct,
        (_, Some(name)) if name.ends_with(".pdf") => "application/pdf".to_string(),
        (ct, _) => ct.unwrap_or_default(),
    };
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("could not read upload: {e}")))?;
    Ok(FilePart {
        bytes,
        content_type,
    })
}

async fn read_text(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("could not read form field: {e}")))
}

async fn next_field(multipart: &mut Multipart) -> Result<Option<Field<'_>>, AppError> {
    multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart body: {e}")))
}

/// POST /api/parse-resume
///
/// Decodes the `file` part and returns the structured fields without
/// touching any profile.
pub async fn handle_parse_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ParseResumeResponse>, AppError> {
    let mut file = None;
    while let Some(field) = next_field(&mut multipart).await? {
        if field.name() == Some("file") {
            file = Some(read_file(field).await?);
        }
    }
    let file = file.ok_or_else(|| AppError::Validation("missing 'file' part".to_string()))?;

    let document = Document::new(file.bytes, file.content_type, "anonymous");
    let extracted = decode_document(document, state.config.decode_timeout).await?;
    let fields = state.extractor.extract(&extracted.content).await?;

    info!(
        document_id = %extracted.document_id,
        skills = fields.skills.len(),
        education = fields.education.len(),
        experience = fields.experience.len(),
        "resume parsed"
    );

    Ok(Json(ParseResumeResponse {
        fields,
        text: extracted.content,
        extractor: state.extractor.name(),
    }))
}

/// POST /api/resume/upload
///
/// Multipart parts: `resume` (PDF), `role`, `user_id`. Runs the full
/// pipeline and returns the assessment, extracted fields and sync result.
pub async fn handle_resume_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadOutcome>, AppError> {
    let mut file = None;
    let mut role = None;
    let mut user_id = None;
    while let Some(field) = next_field(&mut multipart).await? {
        match field.name() {
            Some("resume") => file = Some(read_file(field).await?),
            Some("role") => role = Some(read_text(field).await?),
            Some("user_id") => user_id = Some(read_text(field).await?),
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::Validation("missing 'resume' part".to_string()))?;
    let upload = ResumeUpload {
        user_id: user_id.unwrap_or_default(),
        role: role.unwrap_or_default(),
        bytes: file.bytes,
        content_type: file.content_type,
    };

    let outcome = ResumePipeline::from_state(&state).run(upload).await?;
    Ok(Json(outcome))
}
