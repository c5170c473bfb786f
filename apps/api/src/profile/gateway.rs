//! Profile sync gateway: the single write path for profile state.
//!
//! A sync is validated first, then applied with one `upsert_profile` call
//! bounded by `STORE_TIMEOUT_SECS`. Timeouts surface as `StoreUnavailable`;
//! retrying is left to the caller, which is safe because a sync is
//! idempotent. An assessment attached to the update is written by that same
//! upsert; standalone assessments go through `record_assessment`, so every
//! store call shares the timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::profile::models::{AssessmentRecord, Profile, ProfileUpdate, SkillSet, SyncRequest};
use crate::profile::store::{ProfileStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncAck {
    pub user_id: String,
    /// Size of the written skill list; `None` when stored skills were kept.
    pub skills: Option<usize>,
}

#[derive(Clone)]
pub struct ProfileSyncGateway {
    store: Arc<dyn ProfileStore>,
    timeout: Duration,
}

impl ProfileSyncGateway {
    pub fn new(store: Arc<dyn ProfileStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Rejects malformed requests before anything touches the store.
    pub fn validate(request: SyncRequest) -> Result<ProfileUpdate, AppError> {
        let user_id = request.user_id.trim();
        if user_id.is_empty() {
            return Err(AppError::Validation("user_id is required".to_string()));
        }

        let mut skills = SkillSet::new();
        for (i, name) in request.skills.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(AppError::Validation(format!("skills[{i}] is empty")));
            }
            skills.insert(name);
        }

        let fields = request.profile;
        if let Some(goals) = &fields.goals {
            if goals.target_role.trim().is_empty() {
                return Err(AppError::Validation(
                    "profile.goals.target_role must not be empty".to_string(),
                ));
            }
        }
        if let Some(education) = &fields.education {
            for (i, entry) in education.iter().enumerate() {
                if entry.degree.trim().is_empty() && entry.institution.trim().is_empty() {
                    return Err(AppError::Validation(format!(
                        "profile.education[{i}] needs a degree or an institution"
                    )));
                }
            }
        }
        if let Some(experience) = &fields.experience {
            for (i, entry) in experience.iter().enumerate() {
                if entry.role.trim().is_empty() && entry.company.trim().is_empty() {
                    return Err(AppError::Validation(format!(
                        "profile.experience[{i}] needs a role or a company"
                    )));
                }
            }
        }

        Ok(ProfileUpdate {
            user_id: user_id.to_string(),
            fields,
            skills: Some(skills),
            assessment: None,
        })
    }

    pub async fn sync(&self, request: SyncRequest) -> Result<SyncAck, AppError> {
        let update = Self::validate(request)?;
        self.apply(&update).await
    }

    /// Applies an already validated update. An attached assessment is
    /// written in the same upsert.
    pub async fn apply(&self, update: &ProfileUpdate) -> Result<SyncAck, AppError> {
        self.bounded("upsert_profile", self.store.upsert_profile(update))
            .await?;
        info!(
            user_id = %update.user_id,
            skills = ?update.skills.as_ref().map(SkillSet::len),
            with_assessment = update.assessment.is_some(),
            "profile synced"
        );
        Ok(SyncAck {
            user_id: update.user_id.clone(),
            skills: update.skills.as_ref().map(SkillSet::len),
        })
    }

    pub async fn record_assessment(&self, record: &AssessmentRecord) -> Result<(), AppError> {
        self.bounded("insert_assessment", self.store.insert_assessment(record))
            .await
    }

    pub async fn profile(&self, user_id: &str) -> Result<Profile, AppError> {
        self.bounded("get_profile", self.store.get_profile(user_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile {user_id} not found")))
    }

    pub async fn latest_assessment(&self, user_id: &str) -> Result<AssessmentRecord, AppError> {
        self.bounded("latest_assessment", self.store.latest_assessment(user_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no assessment recorded for {user_id}")))
    }

    async fn bounded<T>(
        &self,
        op: &str,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, AppError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| {
                warn!(op, error = %e, "store call failed");
                AppError::from(e)
            }),
            Err(_) => {
                warn!(op, timeout = ?self.timeout, "store call timed out");
                Err(AppError::StoreUnavailable(format!(
                    "{op} timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }
}
