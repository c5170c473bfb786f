//! Axum route handlers for career assessments.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::assessment::fit_scoring::TargetRole;
use crate::errors::AppError;
use crate::ingest::decoder::ExtractedText;
use crate::ingest::normalizer::PreparedResume;
use crate::profile::handlers::UserIdQuery;
use crate::profile::models::{AssessmentFeedback, AssessmentRecord};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AssessmentRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub target_role: String,
    #[serde(default)]
    pub resume_text: String,
}

#[derive(Debug, Serialize)]
pub struct AssessmentResponse {
    pub id: Uuid,
    pub score: u32,
    pub feedback: AssessmentFeedback,
    pub target_role: String,
    pub scorer_backend: String,
}

/// POST /api/career-assessment
///
/// Scores plain résumé text against a role and appends the result to the
/// user's assessment history.
pub async fn handle_career_assessment(
    State(state): State<AppState>,
    Json(request): Json<AssessmentRequest>,
) -> Result<Json<AssessmentResponse>, AppError> {
    let user_id = request.user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::Validation("user_id is required".to_string()));
    }
    let role = TargetRole::parse(&request.target_role)?;
    let prepared = PreparedResume::new(ExtractedText::from_plain(&request.resume_text)?);

    let assessment = state.fit_scorer.score(&prepared, &role).await?;
    let record = AssessmentRecord::new(user_id, &request.resume_text, &assessment);
    state.gateway.record_assessment(&record).await?;

    info!(
        user_id,
        score = assessment.score,
        backend = %assessment.scorer_backend,
        "career assessment recorded"
    );

    Ok(Json(AssessmentResponse {
        id: assessment.id,
        score: assessment.score,
        feedback: AssessmentFeedback::from(&assessment),
        target_role: assessment.target_role,
        scorer_backend: assessment.scorer_backend,
    }))
}

/// GET /api/assessments/latest?user_id=
pub async fn handle_latest_assessment(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<AssessmentRecord>, AppError> {
    let record = state.gateway.latest_assessment(params.user_id.trim()).await?;
    Ok(Json(record))
}
