//! Qualitative feedback attached to a keyword fit score.
//!
//! `StaticFeedback` reproduces the fixed wording used so far: three strengths
//! and three improvements, varied only by the target role. A content-aware
//! policy can replace it through `KeywordFitScorer::with_feedback`.

use crate::assessment::fit_scoring::{KeywordMatch, TargetRole};

/// Everything a feedback policy may look at.
pub struct FeedbackContext<'a> {
    pub target_role: &'a TargetRole,
    pub keywords: &'a KeywordMatch,
    pub score: u32,
}

pub trait FeedbackPolicy: Send + Sync {
    fn strengths(&self, ctx: &FeedbackContext<'_>) -> Vec<String>;
    fn improvements(&self, ctx: &FeedbackContext<'_>) -> Vec<String>;
}

pub struct StaticFeedback;

impl FeedbackPolicy for StaticFeedback {
    fn strengths(&self, ctx: &FeedbackContext<'_>) -> Vec<String> {
        vec![
            "Resume format interacts well with parser".to_string(),
            format!("Contains relevant keywords for {}", ctx.target_role.as_str()),
            "Clear professional experience section detected".to_string(),
        ]
    }

    fn improvements(&self, _ctx: &FeedbackContext<'_>) -> Vec<String> {
        vec![
            "Include more quantifiable achievements".to_string(),
            "Add a dedicated skills section if missing".to_string(),
            "Tailor resume summary to the specific job description".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::assessment::fit_scoring::{KeywordFitScorer, ScoringPolicy};
    use crate::ingest::decoder::ExtractedText;
    use crate::ingest::normalizer::PreparedResume;

    struct GapFeedback;

    impl FeedbackPolicy for GapFeedback {
        fn strengths(&self, ctx: &FeedbackContext<'_>) -> Vec<String> {
            ctx.keywords
                .breakdown
                .present
                .iter()
                .map(|k| format!("Mentions {k}"))
                .collect()
        }

        fn improvements(&self, ctx: &FeedbackContext<'_>) -> Vec<String> {
            ctx.keywords
                .breakdown
                .missing
                .iter()
                .map(|k| format!("Add evidence of {k} (score {})", ctx.score))
                .collect()
        }
    }

    #[test]
    fn test_static_feedback_interpolates_role_only() {
        let role = TargetRole::parse("Senior Frontend Engineer").unwrap();
        let prepared = PreparedResume::new(ExtractedText::from_plain("React").unwrap());
        let assessment = KeywordFitScorer::new(ScoringPolicy::default()).assess(&prepared, &role);

        assert_eq!(
            assessment.strengths[1],
            "Contains relevant keywords for Senior Frontend Engineer"
        );
        assert_eq!(
            assessment.improvements,
            vec![
                "Include more quantifiable achievements",
                "Add a dedicated skills section if missing",
                "Tailor resume summary to the specific job description",
            ]
        );
    }

    #[test]
    fn test_feedback_policy_is_swappable() {
        let scorer = KeywordFitScorer::with_feedback(ScoringPolicy::default(), Arc::new(GapFeedback));
        let role = TargetRole::parse("rust kafka").unwrap();
        let prepared = PreparedResume::new(ExtractedText::from_plain("Rust services").unwrap());

        let assessment = scorer.assess(&prepared, &role);
        assert_eq!(assessment.strengths, vec!["Mentions rust"]);
        assert_eq!(assessment.improvements, vec!["Add evidence of kafka (score 90)"]);
    }
}
