use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::assessment::fit_scoring::{MatchMode, ScoringPolicy};
use crate::llm_client::LlmConfig;

/// Which `FitScorer` backend the service wires in at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorerBackend {
    Keyword,
    Llm,
}

impl FromStr for ScorerBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyword" => Ok(ScorerBackend::Keyword),
            "llm" => Ok(ScorerBackend::Llm),
            other => bail!("unknown fit scorer '{other}' (expected keyword|llm)"),
        }
    }
}

/// Which `FieldExtractor` strategy the service wires in at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    Rules,
    Llm,
}

impl FromStr for ExtractionStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rules" | "rule" => Ok(ExtractionStrategy::Rules),
            "llm" => Ok(ExtractionStrategy::Llm),
            other => bail!("unknown extraction strategy '{other}' (expected rules|llm)"),
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// Built once in `main` and handed to constructors; nothing below `main`
/// reads the process environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. The in-memory store is used when unset.
    pub database_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub llm: LlmConfig,
    pub fit_scorer: ScorerBackend,
    pub extraction: ExtractionStrategy,
    pub scoring: ScoringPolicy,
    pub decode_timeout: Duration,
    pub store_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let api_keys = std::env::var("LLM_API_KEYS")
            .map(|raw| parse_key_list(&raw))
            .unwrap_or_default();

        let mut llm = LlmConfig::new(api_keys);
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            llm.model = model;
        }

        let config = Config {
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            llm,
            fit_scorer: env_or("FIT_SCORER", ScorerBackend::Keyword)?,
            extraction: env_or("EXTRACTION_STRATEGY", ExtractionStrategy::Rules)?,
            scoring: ScoringPolicy {
                base: env_or("FIT_SCORE_BASE", 40)?,
                cap: env_or("FIT_SCORE_CAP", 95)?,
                match_mode: env_or("KEYWORD_MATCH_MODE", MatchMode::Substring)?,
            },
            decode_timeout: Duration::from_secs(env_or("DECODE_TIMEOUT_SECS", 30)?),
            store_timeout: Duration::from_secs(env_or("STORE_TIMEOUT_SECS", 5)?),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Rejects combinations that cannot work at runtime.
    pub fn validate(&self) -> Result<()> {
        let needs_llm =
            self.fit_scorer == ScorerBackend::Llm || self.extraction == ExtractionStrategy::Llm;
        if needs_llm && self.llm.api_keys.is_empty() {
            bail!("LLM_API_KEYS must be set when FIT_SCORER or EXTRACTION_STRATEGY is 'llm'");
        }
        if self.scoring.cap > 100 {
            bail!("FIT_SCORE_CAP must be <= 100, got {}", self.scoring.cap);
        }
        if self.scoring.base > self.scoring.cap {
            bail!(
                "FIT_SCORE_BASE ({}) must not exceed FIT_SCORE_CAP ({})",
                self.scoring.base,
                self.scoring.cap
            );
        }
        Ok(())
    }
}

/// Splits a comma-separated key list, dropping blanks.
pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("Environment variable '{key}' has an invalid value")),
        _ => Ok(default),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: None,
        port: 0,
        rust_log: "debug".to_string(),
        llm: LlmConfig::new(vec![]),
        fit_scorer: ScorerBackend::Keyword,
        extraction: ExtractionStrategy::Rules,
        scoring: ScoringPolicy::default(),
        decode_timeout: Duration::from_secs(5),
        store_timeout: Duration::from_secs(1),
        max_upload_bytes: 1024 * 1024,
    }
}
