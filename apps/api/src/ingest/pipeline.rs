//! Resume Pipeline: Decode → Normalize → Score → Extract → Sync.
//!
//! One run per upload. The only mutation is the final
//! `ProfileSyncGateway::apply`: one upsert that carries the profile fields
//! and the new assessment together. A run that fails or is cancelled before
//! it leaves both the profile and its assessment history untouched.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};

use crate::assessment::fit_scoring::{FitAssessment, FitScorer, TargetRole};
use crate::errors::AppError;
use crate::extraction::{ExtractedFields, FieldExtractor};
use crate::ingest::decoder::{decode_document, Document};
use crate::ingest::normalizer::PreparedResume;
use crate::profile::gateway::{ProfileSyncGateway, SyncAck};
use crate::profile::models::{AssessmentRecord, Goals, ProfileFields, ProfileUpdate};
use crate::state::AppState;

/// A received upload, before any decoding.
#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub user_id: String,
    pub role: String,
    pub bytes: Bytes,
    pub content_type: String,
}

#[derive(Debug, Serialize)]
pub struct UploadOutcome {
    pub assessment: FitAssessment,
    pub extracted: ExtractedFields,
    pub extractor: &'static str,
    /// True when extraction failed upstream and empty fields were stored.
    pub extraction_degraded: bool,
    pub sync: SyncAck,
}

#[derive(Clone)]
pub struct ResumePipeline {
    fit_scorer: Arc<dyn FitScorer>,
    extractor: Arc<dyn FieldExtractor>,
    gateway: ProfileSyncGateway,
    decode_timeout: Duration,
}

impl ResumePipeline {
    pub fn new(
        fit_scorer: Arc<dyn FitScorer>,
        extractor: Arc<dyn FieldExtractor>,
        gateway: ProfileSyncGateway,
        decode_timeout: Duration,
    ) -> Self {
        Self {
            fit_scorer,
            extractor,
            gateway,
            decode_timeout,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.fit_scorer.clone(),
            state.extractor.clone(),
            state.gateway.clone(),
            state.config.decode_timeout,
        )
    }

    pub async fn run(&self, upload: ResumeUpload) -> Result<UploadOutcome, AppError> {
        let user_id = upload.user_id.trim().to_string();
        if user_id.is_empty() {
            return Err(AppError::Validation("user_id is required".to_string()));
        }
        let role = TargetRole::parse(&upload.role)?;

        let document = Document::new(upload.bytes, upload.content_type, user_id.clone());
        let extracted = decode_document(document, self.decode_timeout).await?;
        let prepared = PreparedResume::new(extracted);

        let assessment = self.fit_scorer.score(&prepared, &role).await?;

        let (fields, degraded) = match self.extractor.extract(&prepared.extracted.content).await {
            Ok(fields) => (fields, false),
            Err(AppError::ExternalService(msg)) => {
                warn!(
                    user_id = %user_id,
                    extractor = self.extractor.name(),
                    "field extraction failed, storing raw text only: {msg}"
                );
                (ExtractedFields::default(), true)
            }
            Err(e) => return Err(e),
        };

        let record = AssessmentRecord::new(&user_id, &prepared.extracted.content, &assessment);
        let update = profile_update(&user_id, &role, &prepared, &fields, record);
        let sync = self.gateway.apply(&update).await?;

        info!(
            user_id = %user_id,
            score = assessment.score,
            skills = fields.skills.len(),
            degraded,
            "resume upload processed"
        );

        Ok(UploadOutcome {
            assessment,
            extracted: fields,
            extractor: self.extractor.name(),
            extraction_degraded: degraded,
            sync,
        })
    }
}

/// Empty extracted collections, skills included, leave stored values alone.
fn profile_update(
    user_id: &str,
    role: &TargetRole,
    prepared: &PreparedResume,
    fields: &ExtractedFields,
    record: AssessmentRecord,
) -> ProfileUpdate {
    ProfileUpdate {
        user_id: user_id.to_string(),
        fields: ProfileFields {
            bio: Some(fields.bio.clone()).filter(|b| !b.is_empty()),
            education: Some(fields.education.clone()).filter(|e| !e.is_empty()),
            experience: Some(fields.experience.clone()).filter(|e| !e.is_empty()),
            goals: Some(Goals {
                target_role: role.as_str().to_string(),
            }),
            resume_text: Some(prepared.extracted.content.clone()),
        },
        skills: Some(fields.skills.clone()).filter(|s| !s.is_empty()),
        assessment: Some(record),
    }
}
