//! Extraction delegated to the external judgment service.

use async_trait::async_trait;
use tracing::info;

use crate::errors::AppError;
use crate::extraction::prompts::{EXTRACTION_PROMPT_TEMPLATE, EXTRACTION_SYSTEM};
use crate::extraction::{ExtractedFields, FieldExtractor};
use crate::llm_client::prompts::fill;
use crate::llm_client::LlmClient;

pub struct LlmFieldExtractor(pub LlmClient);

#[async_trait]
impl FieldExtractor for LlmFieldExtractor {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn extract(&self, raw_text: &str) -> Result<ExtractedFields, AppError> {
        let prompt = fill(EXTRACTION_PROMPT_TEMPLATE, &[("resume_text", raw_text)]);
        let fields: ExtractedFields = self.0.call_json(&prompt, EXTRACTION_SYSTEM).await?;
        info!(
            "LLM extraction returned {} skills, {} education, {} experience entries",
            fields.skills.len(),
            fields.education.len(),
            fields.experience.len()
        );
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::test_support::{client_for, spawn_stub};

    #[tokio::test]
    async fn test_llm_extraction_normalizes_shape() {
        let base = spawn_stub(
            r#"```json
{"skills": ["Python", "python", "React"],
 "education": [{"degree": "BS CS", "institution": "Test Univ", "year": 2024}],
 "experience": [{"role": "Engineer", "company": "Acme"}],
 "bio": "Builder"}
```"#,
        )
        .await;
        let extractor = LlmFieldExtractor(client_for(base, &["good"]));

        let fields = extractor.extract("resume").await.unwrap();
        assert_eq!(fields.skills.to_vec(), vec!["python", "react"]);
        assert_eq!(fields.education[0].year.as_deref(), Some("2024"));
        assert_eq!(fields.experience[0].duration, None);
        assert_eq!(fields.bio, "Builder");
    }

    #[tokio::test]
    async fn test_llm_extraction_failure_is_external() {
        let base = spawn_stub("not json").await;
        let extractor = LlmFieldExtractor(client_for(base, &["good"]));

        let err = extractor.extract("resume").await.unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));
    }
}
