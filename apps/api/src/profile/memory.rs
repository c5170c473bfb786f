//! In-memory [`ProfileStore`] for tests and local runs without Postgres.
//!
//! Profiles and assessment history sit behind one `std::sync::RwLock`, so
//! an upsert (profile, skills and its assessment) lands under a single write
//! lock and a read sees one consistent state.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::profile::models::{AssessmentRecord, Profile, ProfileUpdate};
use crate::profile::store::{ProfileStore, StoreError};

#[derive(Default)]
struct MemoryState {
    profiles: HashMap<String, Profile>,
    assessments: Vec<AssessmentRecord>,
}

impl MemoryState {
    fn latest_assessment(&self, user_id: &str) -> Option<&AssessmentRecord> {
        self.assessments
            .iter()
            .filter(|a| a.user_id == user_id)
            .max_by_key(|a| a.created_at)
    }
}

#[derive(Default)]
pub struct InMemoryProfileStore {
    state: RwLock<MemoryState>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn upsert_profile(&self, update: &ProfileUpdate) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(poisoned)?;
        state
            .profiles
            .entry(update.user_id.clone())
            .or_insert_with(|| Profile::empty(&update.user_id))
            .apply(update);
        if let Some(record) = &update.assessment {
            state.assessments.push(record.clone());
        }
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.profiles.get(user_id).map(|profile| Profile {
            latest_assessment_id: state.latest_assessment(user_id).map(|a| a.id),
            ..profile.clone()
        }))
    }

    async fn insert_assessment(&self, record: &AssessmentRecord) -> Result<(), StoreError> {
        self.state
            .write()
            .map_err(poisoned)?
            .assessments
            .push(record.clone());
        Ok(())
    }

    async fn latest_assessment(
        &self,
        user_id: &str,
    ) -> Result<Option<AssessmentRecord>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.latest_assessment(user_id).cloned())
    }
}
