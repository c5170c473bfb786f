//! Structured field extraction: skills, education, experience and bio from résumé text.
//!
//! Callers depend on the `FieldExtractor` trait only. `RuleBasedExtractor` is
//! the deterministic default; `LlmFieldExtractor` delegates to the external
//! service and returns the same shape.

pub mod llm;
pub mod prompts;
pub mod rules;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::profile::models::{EducationEntry, ExperienceEntry, SkillSet};

pub use llm::LlmFieldExtractor;
pub use rules::RuleBasedExtractor;

/// Extraction output. Every collection may be empty; that is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    #[serde(default)]
    pub skills: SkillSet,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub bio: String,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
            && self.education.is_empty()
            && self.experience.is_empty()
            && self.bio.is_empty()
    }
}

#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// Short label for logs and responses ("rules" | "llm").
    fn name(&self) -> &'static str;

    async fn extract(&self, raw_text: &str) -> Result<ExtractedFields, AppError>;
}
