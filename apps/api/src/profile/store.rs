//! Storage abstraction for profiles and assessment history.
//!
//! Implementations must be `Send + Sync`; `AppState` carries an
//! `Arc<dyn ProfileStore>` chosen at startup (Postgres, or in-memory when
//! no `DATABASE_URL` is configured).

use async_trait::async_trait;
use thiserror::Error;

use crate::errors::AppError;
use crate::profile::models::{AssessmentRecord, Profile, ProfileUpdate};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Transient: connection refused, pool exhausted, I/O failure.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend answered but refused or could not decode the data.
    #[error("store rejected request: {0}")]
    Rejected(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
            other => StoreError::Rejected(other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AppError::StoreUnavailable(msg),
            StoreError::Rejected(msg) => AppError::Store(msg),
        }
    }
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Writes profile fields, the skill list and any attached assessment as
    /// one all-or-nothing operation. Fields absent from `update` keep their
    /// stored value.
    async fn upsert_profile(&self, update: &ProfileUpdate) -> Result<(), StoreError>;

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError>;

    async fn insert_assessment(&self, record: &AssessmentRecord) -> Result<(), StoreError>;

    async fn latest_assessment(
        &self,
        user_id: &str,
    ) -> Result<Option<AssessmentRecord>, StoreError>;
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_transport_failures_are_unavailable() {
        let cases = [
            sqlx::Error::PoolTimedOut,
            sqlx::Error::PoolClosed,
            sqlx::Error::WorkerCrashed,
            sqlx::Error::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "refused")),
            sqlx::Error::Protocol("unexpected message".to_string()),
        ];
        for err in cases {
            let mapped = StoreError::from(err);
            assert!(matches!(mapped, StoreError::Unavailable(_)), "got {mapped:?}");
        }
    }

    #[test]
    fn test_answered_failures_are_rejected() {
        let mapped = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(mapped, StoreError::Rejected(_)));

        let mapped = StoreError::from(sqlx::Error::ColumnNotFound("bio".to_string()));
        assert!(matches!(mapped, StoreError::Rejected(_)));
    }

    #[test]
    fn test_store_errors_keep_retryability_in_app_errors() {
        let unavailable = AppError::from(StoreError::Unavailable("down".to_string()));
        assert!(matches!(unavailable, AppError::StoreUnavailable(_)));
        assert!(unavailable.is_retryable());

        let rejected = AppError::from(StoreError::Rejected("constraint".to_string()));
        assert!(matches!(rejected, AppError::Store(_)));
        assert!(!rejected.is_retryable());
    }
}
