use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use uuid::Uuid;

use crate::assessment::fit_scoring::{FitAssessment, KeywordBreakdown};

/// Distinct skill names, trimmed and lower-cased. Blank names are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SkillSet(BTreeSet<String>);

impl SkillSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the name was blank or already present.
    pub fn insert(&mut self, name: &str) -> bool {
        let normalized = name.trim().to_lowercase();
        if normalized.is_empty() {
            return false;
        }
        self.0.insert(normalized)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl From<Vec<String>> for SkillSet {
    fn from(names: Vec<String>) -> Self {
        let mut set = SkillSet::new();
        for name in &names {
            set.insert(name);
        }
        set
    }
}

impl From<SkillSet> for Vec<String> {
    fn from(set: SkillSet) -> Self {
        set.0.into_iter().collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub institution: String,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goals {
    pub target_role: String,
}

/// The `profile` object of a sync request. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<Vec<EducationEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<Vec<ExperienceEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<Goals>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_text: Option<String>,
}

/// Wire shape of `POST /api/sync-profile`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub profile: ProfileFields,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// A validated sync request, ready for a single upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileUpdate {
    pub user_id: String,
    pub fields: ProfileFields,
    /// `None` keeps the stored skills; `Some` replaces them, even when empty.
    pub skills: Option<SkillSet>,
    /// Written in the same upsert, so history and profile change together.
    pub assessment: Option<AssessmentRecord>,
}

/// The persistent per-user aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub bio: Option<String>,
    pub skills: SkillSet,
    pub education: Vec<EducationEntry>,
    pub experience: Vec<ExperienceEntry>,
    pub goals: Option<Goals>,
    pub resume_text: Option<String>,
    pub latest_assessment_id: Option<Uuid>,
}

impl Profile {
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Self::default()
        }
    }

    /// Soft overwrite: present fields replace stored ones, a present skill
    /// list replaces the stored one wholesale.
    pub fn apply(&mut self, update: &ProfileUpdate) {
        let fields = &update.fields;
        if let Some(bio) = &fields.bio {
            self.bio = Some(bio.clone());
        }
        if let Some(education) = &fields.education {
            self.education = education.clone();
        }
        if let Some(experience) = &fields.experience {
            self.experience = experience.clone();
        }
        if let Some(goals) = &fields.goals {
            self.goals = Some(goals.clone());
        }
        if let Some(resume_text) = &fields.resume_text {
            self.resume_text = Some(resume_text.clone());
        }
        if let Some(skills) = &update.skills {
            self.skills = skills.clone();
        }
    }
}

/// Feedback body as stored with an assessment and returned over the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentFeedback {
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    #[serde(default)]
    pub keywords: KeywordBreakdown,
}

impl From<&FitAssessment> for AssessmentFeedback {
    fn from(assessment: &FitAssessment) -> Self {
        Self {
            strengths: assessment.strengths.clone(),
            improvements: assessment.improvements.clone(),
            keywords: assessment.keywords.clone(),
        }
    }
}

/// One row of assessment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AssessmentRecord {
    pub id: Uuid,
    pub user_id: String,
    pub target_role: String,
    pub resume_text: String,
    pub score: i32,
    pub feedback: Value,
    pub scorer_backend: String,
    pub created_at: DateTime<Utc>,
}

impl AssessmentRecord {
    pub fn new(user_id: &str, resume_text: &str, assessment: &FitAssessment) -> Self {
        let feedback = json!({
            "strengths": assessment.strengths,
            "improvements": assessment.improvements,
            "keywords": {
                "present": assessment.keywords.present,
                "missing": assessment.keywords.missing,
            },
        });
        Self {
            id: assessment.id,
            user_id: user_id.to_string(),
            target_role: assessment.target_role.clone(),
            resume_text: resume_text.to_string(),
            score: assessment.score as i32,
            feedback,
            scorer_backend: assessment.scorer_backend.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Accepts `"2019"` or `2019` (external extractors emit either).
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::fit_scoring::{KeywordFitScorer, ScoringPolicy, TargetRole};
    use crate::ingest::decoder::ExtractedText;
    use crate::ingest::normalizer::PreparedResume;

    #[test]
    fn test_skill_set_normalizes_and_dedupes() {
        let set = SkillSet::from(vec![
            "Python".to_string(),
            " python ".to_string(),
            "".to_string(),
            "Rust".to_string(),
        ]);
        assert_eq!(set.to_vec(), vec!["python", "rust"]);
    }

    #[test]
    fn test_skill_set_serializes_as_array() {
        let set = SkillSet::from(vec!["Go".to_string()]);
        assert_eq!(serde_json::to_value(&set).unwrap(), json!(["go"]));
        let back: SkillSet = serde_json::from_value(json!(["GO", "go"])).unwrap();
        assert_eq!(back.len(), 1);
    }

    #[test]
    fn test_education_year_accepts_number_or_string() {
        let a: EducationEntry =
            serde_json::from_value(json!({"degree": "BS", "institution": "MIT", "year": 2020}))
                .unwrap();
        let b: EducationEntry =
            serde_json::from_value(json!({"degree": "BS", "institution": "MIT", "year": "2020"}))
                .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.year.as_deref(), Some("2020"));

        let c: EducationEntry = serde_json::from_value(json!({"degree": "BS"})).unwrap();
        assert_eq!(c.year, None);
        assert_eq!(c.institution, "");
    }

    #[test]
    fn test_sync_request_matches_wire_contract() {
        let req: SyncRequest = serde_json::from_value(json!({
            "user_id": "u-1",
            "profile": {
                "bio": "Engineer",
                "education": [{"degree": "BS CS", "institution": "Test Univ", "year": "2024"}],
                "goals": {"target_role": "SRE"},
                "full_name": "ignored"
            },
            "skills": ["Python", "Flask"]
        }))
        .unwrap();
        assert_eq!(req.user_id, "u-1");
        assert_eq!(req.profile.bio.as_deref(), Some("Engineer"));
        assert!(req.profile.experience.is_none());
        assert_eq!(req.profile.goals.unwrap().target_role, "SRE");
        assert_eq!(req.skills.len(), 2);
    }

    #[test]
    fn test_apply_keeps_absent_fields() {
        let mut profile = Profile::empty("u-1");
        profile.bio = Some("old bio".to_string());
        profile.resume_text = Some("old text".to_string());

        let update = ProfileUpdate {
            user_id: "u-1".to_string(),
            fields: ProfileFields {
                resume_text: Some("new text".to_string()),
                ..ProfileFields::default()
            },
            skills: Some(SkillSet::from(vec!["rust".to_string()])),
            assessment: None,
        };
        profile.apply(&update);

        assert_eq!(profile.bio.as_deref(), Some("old bio"));
        assert_eq!(profile.resume_text.as_deref(), Some("new text"));
        assert_eq!(profile.skills.to_vec(), vec!["rust"]);
    }

    #[test]
    fn test_assessment_record_feedback_matches_wire_shape() {
        let prepared = PreparedResume::new(ExtractedText::from_plain("data analyst").unwrap());
        let role = TargetRole::parse("data scientist").unwrap();
        let assessment = KeywordFitScorer::new(ScoringPolicy::default()).assess(&prepared, &role);

        let record = AssessmentRecord::new("u-1", "data analyst", &assessment);
        let feedback: AssessmentFeedback = serde_json::from_value(record.feedback).unwrap();

        assert_eq!(feedback, AssessmentFeedback::from(&assessment));
        assert_eq!(feedback.keywords.missing, vec!["scientist"]);
        assert_eq!(record.score, 90);
    }
}
