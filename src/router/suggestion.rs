//! Prompt and answer handling for completion-based tool suggestion.

use crate::types::ToolDefinition;

/// Sentinel the model answers with when nothing fits.
pub const NO_TOOL: &str = "NONE";

/// Build the selection prompt listing every candidate.
pub fn build_prompt(utterance: &str, candidates: &[ToolDefinition]) -> String {
    let mut lines = vec![
        "You pick the single tool that best handles a restaurant customer's request.".to_string(),
        "Available tools, with description and example:".to_string(),
        "---".to_string(),
    ];
    for tool in candidates {
        lines.push(format!("Tool: {}", tool.name));
        lines.push(format!("Description: {}", tool.description));
        if !tool.example_user_prompt.is_empty() {
            lines.push(format!("Example: {}", tool.example_user_prompt));
        }
        lines.push("---".to_string());
    }
    lines.extend([
        "Choose the most suitable tool for the request below.".to_string(),
        "RULES:".to_string(),
        "1. Reply with the tool name only (e.g. create_booking, show_menu).".to_string(),
        "2. Do not add punctuation or any other text.".to_string(),
        format!("3. If no tool fits, reply {NO_TOOL}."),
        String::new(),
        format!("User Query: {utterance}"),
        String::new(),
        "Tool:".to_string(),
    ]);
    lines.join("\n")
}

/// Normalize a model answer and check it against the candidates.
///
/// Quotes and periods are stripped. Returns `None` for the sentinel and
/// for names outside the candidate set.
pub fn parse_answer(answer: &str, candidates: &[ToolDefinition]) -> Result<Option<String>, String> {
    let name: String = answer
        .trim()
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '.'))
        .collect();
    let name = name.trim();

    if name.eq_ignore_ascii_case(NO_TOOL) {
        return Ok(None);
    }
    if candidates.iter().any(|t| t.name == name) {
        Ok(Some(name.to_string()))
    } else {
        Err(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::new("show_menu", "Hiển thị thực đơn").with_example("cho xem menu"),
            ToolDefinition::new("create_booking", "Đặt bàn mới"),
        ]
    }

    #[test]
    fn prompt_lists_every_candidate() {
        let prompt = build_prompt("đặt bàn", &candidates());
        assert!(prompt.contains("Tool: show_menu"));
        assert!(prompt.contains("Example: cho xem menu"));
        assert!(prompt.contains("Tool: create_booking"));
        assert!(prompt.ends_with("User Query: đặt bàn\n\nTool:"));
    }

    #[test]
    fn answer_is_cleaned_and_validated() {
        let tools = candidates();
        assert_eq!(parse_answer("  \"show_menu\".\n", &tools), Ok(Some("show_menu".into())));
        assert_eq!(parse_answer("none", &tools), Ok(None));
        assert_eq!(parse_answer("order_pizza", &tools), Err("order_pizza".into()));
    }
}
