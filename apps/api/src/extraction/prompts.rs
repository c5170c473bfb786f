use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

pub const EXTRACTION_SYSTEM: &str = JSON_ONLY_SYSTEM;

pub const EXTRACTION_PROMPT_TEMPLATE: &str = r#"Extract structured data from the resume text below.

Return a JSON object with exactly these fields:
- "skills": list of strings (e.g. ["Python", "React", "Project Management"])
- "education": list of objects with fields "degree", "institution", "year"
- "experience": list of objects with fields "role", "company", "duration", "description"
- "bio": a short professional summary (string, empty if none can be derived)

Keep entries in the order they appear in the resume. Use empty lists when a
section is absent.

Resume Text:
{resume_text}
"#;
