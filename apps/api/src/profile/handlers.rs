use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::profile::models::{Profile, SyncRequest};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: String,
}

/// POST /api/sync-profile
///
/// Acknowledges with an empty object once the upsert has committed.
pub async fn handle_sync_profile(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<Value>, AppError> {
    state.gateway.sync(request).await?;
    Ok(Json(json!({})))
}

/// GET /api/profile?user_id=
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Profile>, AppError> {
    let profile = state.gateway.profile(params.user_id.trim()).await?;
    Ok(Json(profile))
}
