use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

pub const ASSESSMENT_SYSTEM: &str = JSON_ONLY_SYSTEM;

pub const ASSESSMENT_PROMPT_TEMPLATE: &str = r#"Analyze the match between this resume and the target role.

Target Role: {target_role}

Return a JSON object with exactly this structure:
{
  "score": integer (0-100, the match percentage),
  "feedback": {
    "strengths": ["up to three short statements about what already fits the role"],
    "improvements": ["up to three short, actionable improvements"],
    "keywords": {
      "present": ["keywords from the role found in the resume"],
      "missing": ["keywords from the role NOT found in the resume"]
    }
  }
}

Resume Text:
{resume_text}
"#;
