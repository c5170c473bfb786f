//! Postgres-backed [`ProfileStore`]. Schema lives in `migrations/0001_init.sql`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{FromRow, PgPool, Postgres};
use tracing::debug;
use uuid::Uuid;

use crate::profile::models::{AssessmentRecord, Profile, ProfileUpdate, SkillSet};
use crate::profile::store::{ProfileStore, StoreError};

/// Proficiency recorded for skills that arrive through a sync.
const DEFAULT_PROFICIENCY: i16 = 3;

pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    user_id: String,
    bio: Option<String>,
    education: Value,
    experience: Value,
    goals: Option<Value>,
    resume_text: Option<String>,
    skills: Vec<String>,
    latest_assessment_id: Option<Uuid>,
}

fn insert_assessment_query(record: &AssessmentRecord) -> Query<'_, Postgres, PgArguments> {
    sqlx::query(
        r#"
        INSERT INTO user_assessments
            (id, user_id, target_role, resume_text, score, feedback, scorer_backend, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(record.id)
    .bind(&record.user_id)
    .bind(&record.target_role)
    .bind(&record.resume_text)
    .bind(record.score)
    .bind(&record.feedback)
    .bind(&record.scorer_backend)
    .bind(record.created_at)
}

fn to_json<T: serde::Serialize>(value: &Option<T>) -> Result<Option<Value>, StoreError> {
    value
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| StoreError::Rejected(format!("unserializable profile field: {e}")))
}

fn from_json<T: DeserializeOwned>(column: &str, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value)
        .map_err(|e| StoreError::Rejected(format!("corrupt {column} column: {e}")))
}

fn profile_from_row(row: ProfileRow) -> Result<Profile, StoreError> {
    Ok(Profile {
        user_id: row.user_id,
        bio: row.bio,
        skills: SkillSet::from(row.skills),
        education: from_json("education", row.education)?,
        experience: from_json("experience", row.experience)?,
        goals: row.goals.map(|g| from_json("goals", g)).transpose()?,
        resume_text: row.resume_text,
        latest_assessment_id: row.latest_assessment_id,
    })
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn upsert_profile(&self, update: &ProfileUpdate) -> Result<(), StoreError> {
        let fields = &update.fields;
        let education = to_json(&fields.education)?;
        let experience = to_json(&fields.experience)?;
        let goals = to_json(&fields.goals)?;

        let mut tx = self.pool.begin().await?;

        // Absent fields bind as NULL and COALESCE back to the stored value.
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, bio, education, experience, goals, resume_text)
            VALUES ($1, $2, COALESCE($3, '[]'::jsonb), COALESCE($4, '[]'::jsonb), $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
                bio         = COALESCE($2, profiles.bio),
                education   = COALESCE($3, profiles.education),
                experience  = COALESCE($4, profiles.experience),
                goals       = COALESCE($5, profiles.goals),
                resume_text = COALESCE($6, profiles.resume_text),
                updated_at  = now()
            "#,
        )
        .bind(&update.user_id)
        .bind(&fields.bio)
        .bind(education)
        .bind(experience)
        .bind(goals)
        .bind(&fields.resume_text)
        .execute(&mut *tx)
        .await?;

        // `None` keeps the stored skill list; `Some` replaces it wholesale.
        if let Some(skills) = &update.skills {
            let skills = skills.to_vec();

            sqlx::query("DELETE FROM user_skills WHERE user_id = $1")
                .bind(&update.user_id)
                .execute(&mut *tx)
                .await?;

            if !skills.is_empty() {
                sqlx::query(
                    "INSERT INTO skills (name) SELECT UNNEST($1::text[]) ON CONFLICT (name) DO NOTHING",
                )
                .bind(&skills)
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    r#"
                    INSERT INTO user_skills (user_id, skill_id, proficiency)
                    SELECT $1, id, $3 FROM skills WHERE name = ANY($2)
                    "#,
                )
                .bind(&update.user_id)
                .bind(&skills)
                .bind(DEFAULT_PROFICIENCY)
                .execute(&mut *tx)
                .await?;
            }
        }

        if let Some(record) = &update.assessment {
            insert_assessment_query(record).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        debug!(
            user_id = %update.user_id,
            skills = ?update.skills.as_ref().map(SkillSet::len),
            "profile upserted"
        );
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        // One statement, one snapshot: row, skills and latest assessment
        // always belong to the same committed state.
        let row: Option<ProfileRow> = sqlx::query_as(
            r#"
            SELECT
                p.user_id, p.bio, p.education, p.experience, p.goals, p.resume_text,
                COALESCE(
                    (SELECT array_agg(s.name ORDER BY s.name)
                     FROM user_skills us
                     JOIN skills s ON s.id = us.skill_id
                     WHERE us.user_id = p.user_id),
                    '{}'::text[]
                ) AS skills,
                (SELECT a.id
                 FROM user_assessments a
                 WHERE a.user_id = p.user_id
                 ORDER BY a.created_at DESC
                 LIMIT 1) AS latest_assessment_id
            FROM profiles p
            WHERE p.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(profile_from_row).transpose()
    }

    async fn insert_assessment(&self, record: &AssessmentRecord) -> Result<(), StoreError> {
        insert_assessment_query(record).execute(&self.pool).await?;
        Ok(())
    }

    async fn latest_assessment(
        &self,
        user_id: &str,
    ) -> Result<Option<AssessmentRecord>, StoreError> {
        Ok(sqlx::query_as::<_, AssessmentRecord>(
            r#"
            SELECT id, user_id, target_role, resume_text, score, feedback, scorer_backend, created_at
            FROM user_assessments
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}
