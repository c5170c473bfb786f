// Shared prompt fragments. Each adapter that talks to the judgment service
// keeps its own prompts.rs alongside it; cross-cutting pieces live here.

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Fills `{name}` placeholders in a prompt template.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_replaces_every_placeholder() {
        let out = fill(
            "Role: {role}. Again: {role}. Text: {text}",
            &[("role", "SRE"), ("text", "hello")],
        );
        assert_eq!(out, "Role: SRE. Again: SRE. Text: hello");
    }
}
