//! Fit scoring: pluggable, trait-based scorer that measures a résumé against a target role.
//!
//! Default: `KeywordFitScorer` (pure-Rust, fast, deterministic, fully testable).
//! Alternative: `LlmFitScorer` (delegates judgment to the external service).
//!
//! `AppState` holds an `Arc<dyn FitScorer>`, chosen at startup via `FIT_SCORER`.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::assessment::feedback::{FeedbackContext, FeedbackPolicy, StaticFeedback};
use crate::assessment::prompts::{ASSESSMENT_PROMPT_TEMPLATE, ASSESSMENT_SYSTEM};
use crate::errors::AppError;
use crate::ingest::normalizer::{NormalizedText, PreparedResume};
use crate::llm_client::prompts::fill;
use crate::llm_client::LlmClient;

// ────────────────────────────────────────────────────────────────────────────
// Inputs and policy
// ────────────────────────────────────────────────────────────────────────────

/// How a keyword token is tested against the résumé.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Keyword may appear anywhere, including inside other words ("art" in "party").
    #[default]
    Substring,
    /// Keyword must equal one of the résumé's tokens.
    WholeToken,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "substring" => Ok(MatchMode::Substring),
            "token" | "whole_token" => Ok(MatchMode::WholeToken),
            other => Err(format!("unknown match mode '{other}' (expected substring|token)")),
        }
    }
}

/// Scoring constants: `min(round(ratio * 100) + base, cap)`, never above 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringPolicy {
    pub base: u32,
    pub cap: u32,
    pub match_mode: MatchMode,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            base: 40,
            cap: 95,
            match_mode: MatchMode::Substring,
        }
    }
}

/// The role a résumé is scored against. Never blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRole(String);

impl TargetRole {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation("target_role cannot be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-cased whitespace-delimited words. Repeats are kept: a repeated
    /// word counts toward both the match count and the token count.
    pub fn keyword_tokens(&self) -> Vec<String> {
        self.0
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output data models (shared across all scorer backends)
// ────────────────────────────────────────────────────────────────────────────

/// Role keywords found / not found in the résumé, first-seen order, no repeats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordBreakdown {
    #[serde(default)]
    pub present: Vec<String>,
    #[serde(default)]
    pub missing: Vec<String>,
}

/// Full fit assessment returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitAssessment {
    pub id: Uuid,
    pub score: u32, // 0 – 100
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub keywords: KeywordBreakdown,
    pub target_role: String,
    /// The `ExtractedText` (document) this was computed from.
    pub text_id: Uuid,
    pub scorer_backend: String, // "keyword" | "llm"
}

/// Raw match counts for one résumé / role pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatch {
    pub matched: usize,
    pub total: usize,
    pub breakdown: KeywordBreakdown,
}

impl KeywordMatch {
    /// `matched / total`, defined as 0 when the role has no tokens.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.matched as f64 / self.total as f64
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The fit scorer trait. Implement this to swap backends without touching
/// the endpoint, handler, or pipeline code.
#[async_trait]
pub trait FitScorer: Send + Sync {
    async fn score(
        &self,
        resume: &PreparedResume,
        role: &TargetRole,
    ) -> Result<FitAssessment, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// KeywordFitScorer: default implementation
// ────────────────────────────────────────────────────────────────────────────

/// Keyword-overlap scorer. No I/O, no randomness.
///
/// Algorithm:
/// 1. Split the role into lower-cased keyword tokens (repeats kept).
/// 2. Count tokens found in the normalized résumé (per `MatchMode`).
/// 3. score = min(round(matched / total × 100) + base, cap), clamped to 100.
/// 4. Feedback comes from the configured `FeedbackPolicy`.
pub struct KeywordFitScorer {
    policy: ScoringPolicy,
    feedback: Arc<dyn FeedbackPolicy>,
}

impl KeywordFitScorer {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self::with_feedback(policy, Arc::new(StaticFeedback))
    }

    pub fn with_feedback(policy: ScoringPolicy, feedback: Arc<dyn FeedbackPolicy>) -> Self {
        Self { policy, feedback }
    }

    pub fn assess(&self, resume: &PreparedResume, role: &TargetRole) -> FitAssessment {
        let keywords = role.keyword_tokens();
        let outcome = match_keywords(&resume.normalized, &keywords, self.policy.match_mode);
        let score = compute_score(&outcome, &self.policy);

        debug!(
            "Keyword fit for '{}': {}/{} matched -> {}",
            role.as_str(),
            outcome.matched,
            outcome.total,
            score
        );

        let ctx = FeedbackContext {
            target_role: role,
            keywords: &outcome,
            score,
        };

        FitAssessment {
            id: Uuid::new_v4(),
            score,
            strengths: self.feedback.strengths(&ctx),
            improvements: self.feedback.improvements(&ctx),
            keywords: outcome.breakdown,
            target_role: role.as_str().to_string(),
            text_id: resume.extracted.document_id,
            scorer_backend: "keyword".to_string(),
        }
    }
}

#[async_trait]
impl FitScorer for KeywordFitScorer {
    async fn score(
        &self,
        resume: &PreparedResume,
        role: &TargetRole,
    ) -> Result<FitAssessment, AppError> {
        Ok(self.assess(resume, role))
    }
}

/// Counts how many `keywords` occur in `resume`.
pub fn match_keywords(resume: &NormalizedText, keywords: &[String], mode: MatchMode) -> KeywordMatch {
    let mut matched = 0;
    let mut breakdown = KeywordBreakdown::default();

    for keyword in keywords {
        let hit = match mode {
            MatchMode::Substring => resume.text.contains(keyword.as_str()),
            MatchMode::WholeToken => resume.tokens.iter().any(|t| t == keyword),
        };

        if hit {
            matched += 1;
            if !breakdown.present.contains(keyword) {
                breakdown.present.push(keyword.clone());
            }
        } else if !breakdown.missing.contains(keyword) {
            breakdown.missing.push(keyword.clone());
        }
    }

    KeywordMatch {
        matched,
        total: keywords.len(),
        breakdown,
    }
}

/// Monotonic in the match ratio; bounded by `policy.cap` and by 100.
pub fn compute_score(outcome: &KeywordMatch, policy: &ScoringPolicy) -> u32 {
    let overlap = (outcome.ratio() * 100.0).round() as u32;
    (overlap + policy.base).min(policy.cap).min(100)
}

// ────────────────────────────────────────────────────────────────────────────
// LlmFitScorer: external judgment backend
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct JudgmentResponse {
    score: f64,
    #[serde(default)]
    feedback: JudgmentFeedback,
}

#[derive(Debug, Default, Deserialize)]
struct JudgmentFeedback {
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
    #[serde(default)]
    keywords: KeywordBreakdown,
}

/// Semantic fit scorer backed by the external judgment service.
pub struct LlmFitScorer(pub LlmClient);

#[async_trait]
impl FitScorer for LlmFitScorer {
    async fn score(
        &self,
        resume: &PreparedResume,
        role: &TargetRole,
    ) -> Result<FitAssessment, AppError> {
        let prompt = fill(
            ASSESSMENT_PROMPT_TEMPLATE,
            &[
                ("target_role", role.as_str()),
                ("resume_text", &resume.extracted.content),
            ],
        );

        let judgment: JudgmentResponse = self.0.call_json(&prompt, ASSESSMENT_SYSTEM).await?;

        Ok(FitAssessment {
            id: Uuid::new_v4(),
            score: clamp_external_score(judgment.score),
            strengths: judgment.feedback.strengths,
            improvements: judgment.feedback.improvements,
            keywords: judgment.feedback.keywords,
            target_role: role.as_str().to_string(),
            text_id: resume.extracted.document_id,
            scorer_backend: "llm".to_string(),
        })
    }
}

/// External scores are untrusted: round and force into [0, 100].
fn clamp_external_score(raw: f64) -> u32 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u32
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::decoder::ExtractedText;
    use crate::llm_client::test_support::{client_for, spawn_stub};

    fn resume(text: &str) -> PreparedResume {
        PreparedResume::new(ExtractedText::from_plain(text).unwrap())
    }

    fn role(raw: &str) -> TargetRole {
        TargetRole::parse(raw).unwrap()
    }

    fn keyword_score(text: &str, target: &str) -> u32 {
        KeywordFitScorer::new(ScoringPolicy::default())
            .assess(&resume(text), &role(target))
            .score
    }

    #[test]
    fn test_exact_match_hits_cap() {
        assert_eq!(keyword_score("5 years of python development", "python"), 95);
    }

    #[test]
    fn test_no_match_keeps_base_floor() {
        assert_eq!(keyword_score("html and css expert", "kubernetes"), 40);
        assert_eq!(keyword_score("html and css expert", "Anything"), 40);
    }

    #[test]
    fn test_partial_multi_token_match() {
        // "data" matches, "senior" and "scientist" do not: round(33.3) + 40
        assert_eq!(
            keyword_score("experienced data analyst", "senior data scientist"),
            73
        );
    }

    #[test]
    fn test_full_match_never_reaches_100() {
        let score = keyword_score(
            "Senior Frontend Engineer with React",
            "Senior Frontend Engineer",
        );
        assert_eq!(score, 95);
    }

    #[test]
    fn test_role_is_case_insensitive() {
        assert_eq!(keyword_score("python developer", "PYTHON"), 95);
    }

    #[test]
    fn test_substring_mode_matches_inside_words() {
        assert_eq!(keyword_score("organized the office party", "art"), 95);
    }

    #[test]
    fn test_whole_token_mode_rejects_partial_words() {
        let policy = ScoringPolicy {
            match_mode: MatchMode::WholeToken,
            ..ScoringPolicy::default()
        };
        let scorer = KeywordFitScorer::new(policy);
        let assessment = scorer.assess(&resume("organized the office party"), &role("art"));
        assert_eq!(assessment.score, 40);
        assert_eq!(assessment.keywords.missing, vec!["art"]);
    }

    #[test]
    fn test_zero_tokens_ratio_is_zero() {
        let outcome = match_keywords(&crate::ingest::normalizer::normalize("rust"), &[], MatchMode::Substring);
        assert_eq!(outcome.ratio(), 0.0);
        assert_eq!(compute_score(&outcome, &ScoringPolicy::default()), 40);
    }

    #[test]
    fn test_repeated_keyword_counts_twice() {
        let outcome = match_keywords(
            &crate::ingest::normalizer::normalize("data pipelines"),
            &role("data data engineer").keyword_tokens(),
            MatchMode::Substring,
        );
        assert_eq!(outcome.matched, 2);
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.breakdown.present, vec!["data"]);
        assert_eq!(outcome.breakdown.missing, vec!["engineer"]);
    }

    #[test]
    fn test_score_bounded_for_any_policy_and_ratio() {
        let policies = [
            ScoringPolicy::default(),
            ScoringPolicy { base: 0, cap: 100, match_mode: MatchMode::Substring },
            ScoringPolicy { base: 100, cap: 100, match_mode: MatchMode::Substring },
            ScoringPolicy { base: 90, cap: 250, match_mode: MatchMode::Substring },
        ];
        for policy in policies {
            for total in 0..6 {
                let mut last = 0;
                for matched in 0..=total {
                    let outcome = KeywordMatch {
                        matched,
                        total,
                        breakdown: KeywordBreakdown::default(),
                    };
                    let score = compute_score(&outcome, &policy);
                    assert!(score <= 100, "score {score} out of bounds");
                    assert!(score >= last, "score decreased as overlap grew");
                    last = score;
                }
            }
        }
    }

    #[test]
    fn test_empty_role_is_rejected() {
        assert!(matches!(TargetRole::parse("   "), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_assessment_references_source_text() {
        let prepared = resume("rust");
        let assessment = KeywordFitScorer::new(ScoringPolicy::default()).assess(&prepared, &role("rust"));
        assert_eq!(assessment.text_id, prepared.extracted.document_id);
        assert_eq!(assessment.target_role, "rust");
        assert_eq!(assessment.scorer_backend, "keyword");
        assert_eq!(assessment.strengths.len(), 3);
        assert_eq!(assessment.improvements.len(), 3);
    }

    #[test]
    fn test_match_mode_parsing() {
        assert_eq!("token".parse::<MatchMode>().unwrap(), MatchMode::WholeToken);
        assert_eq!("Substring".parse::<MatchMode>().unwrap(), MatchMode::Substring);
        assert!("fuzzy".parse::<MatchMode>().is_err());
    }

    #[test]
    fn test_external_score_is_clamped() {
        assert_eq!(clamp_external_score(120.0), 100);
        assert_eq!(clamp_external_score(-3.0), 0);
        assert_eq!(clamp_external_score(72.6), 73);
        assert_eq!(clamp_external_score(f64::NAN), 0);
    }

    #[tokio::test]
    async fn test_llm_scorer_maps_judgment() {
        let base = spawn_stub(
            r#"{"score": 140, "feedback": {"strengths": ["Strong Rust"], "improvements": ["Add metrics"], "keywords": {"present": ["rust"], "missing": ["go"]}}}"#,
        )
        .await;
        let scorer = LlmFitScorer(client_for(base, &["good"]));

        let assessment = scorer
            .score(&resume("Rust services"), &role("Rust Go Engineer"))
            .await
            .unwrap();
        assert_eq!(assessment.score, 100);
        assert_eq!(assessment.strengths, vec!["Strong Rust"]);
        assert_eq!(assessment.keywords.missing, vec!["go"]);
        assert_eq!(assessment.scorer_backend, "llm");
    }

    #[tokio::test]
    async fn test_llm_scorer_rate_limit_is_distinct() {
        let base = spawn_stub("{}").await;
        let scorer = LlmFitScorer(client_for(base, &["limited"]));

        let err = scorer.score(&resume("text"), &role("Rust")).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited(_)));
    }
}
