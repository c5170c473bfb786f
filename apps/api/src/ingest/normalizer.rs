//! Text normalizer: lower-cases, strips control noise and collapses whitespace.

use serde::Serialize;

use crate::ingest::decoder::ExtractedText;

/// Normalized résumé text plus its whitespace-delimited tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedText {
    pub text: String,
    pub tokens: Vec<String>,
}

/// Total and idempotent: `normalize(&normalize(x).text) == normalize(x)`.
pub fn normalize(raw: &str) -> NormalizedText {
    let lowered: String = raw
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .to_lowercase();

    let tokens: Vec<String> = lowered.split_whitespace().map(String::from).collect();
    let text = tokens.join(" ");

    NormalizedText { text, tokens }
}

/// Extracted text paired with its normalized form; the input every scorer sees.
#[derive(Debug, Clone)]
pub struct PreparedResume {
    pub extracted: ExtractedText,
    pub normalized: NormalizedText,
}

impl PreparedResume {
    pub fn new(extracted: ExtractedText) -> Self {
        let normalized = normalize(&extracted.content);
        Self {
            extracted,
            normalized,
        }
    }
}
