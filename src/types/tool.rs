//! Tool types for semantic routing

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{MaitreError, Result};

/// An executable action an agent can route a request to.
///
/// Loaded from a JSON tools file. Only `name` is required; every other
/// field defaults to empty so that sparse definitions stay usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Sample utterance the tool is meant to handle.
    #[serde(default, alias = "example")]
    pub example_user_prompt: String,
    /// Names of the parameters the tool requires, in order.
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Owning service identifier (e.g. `BookingService`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            example_user_prompt: String::new(),
            parameters: Vec::new(),
            service: None,
        }
    }

    #[must_use]
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example_user_prompt = example.into();
        self
    }

    #[must_use]
    pub fn with_parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters = parameters.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Text the router embeds for this tool.
    ///
    /// Returns `None` when the tool has neither a description nor an
    /// example; such a tool can never be matched by similarity.
    pub fn embedding_text(&self) -> Option<String> {
        let description = self.description.trim();
        let example = self.example_user_prompt.trim();
        match (description.is_empty(), example.is_empty()) {
            (true, true) => None,
            (false, true) => Some(description.to_string()),
            (true, false) => Some(example.to_string()),
            (false, false) => Some(format!("{description}. {example}")),
        }
    }

    /// Reject definitions that would only cause ambiguity downstream.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(MaitreError::InvalidTool("empty tool name".into()));
        }
        if self.parameters.iter().any(|p| p.trim().is_empty()) {
            return Err(MaitreError::InvalidTool(format!(
                "tool '{}' has an empty parameter name",
                self.name
            )));
        }
        Ok(())
    }
}

/// Parse a tools document, dropping malformed entries.
///
/// The document must be a JSON array. Each element is deserialized and
/// validated on its own; elements that fail are logged and skipped so a
/// single bad entry cannot hide the rest of the file.
pub fn parse_tools(document: serde_json::Value) -> Result<Vec<ToolDefinition>> {
    let serde_json::Value::Array(entries) = document else {
        return Err(MaitreError::InvalidInput(
            "tools document must be a JSON array".into(),
        ));
    };

    let mut tools = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let parsed = serde_json::from_value::<ToolDefinition>(entry)
            .map_err(MaitreError::from)
            .and_then(|tool| tool.validate().map(|()| tool));
        match parsed {
            Ok(tool) => tools.push(tool),
            Err(e) => warn!(index, error = %e, "skipping malformed tool definition"),
        }
    }
    Ok(tools)
}

/// The router's answer for an utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMatch {
    pub tool: ToolDefinition,
    /// Final score (similarity plus heuristic boosts), rounded to three decimals.
    pub confidence: f64,
}

impl ToolMatch {
    /// JSON object with every required parameter set to `null`.
    ///
    /// Agents start parameter collection from this skeleton.
    pub fn parameter_skeleton(&self) -> serde_json::Map<String, serde_json::Value> {
        self.tool
            .parameters
            .iter()
            .map(|p| (p.clone(), serde_json::Value::Null))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn embedding_text_joins_description_and_example() {
        let tool = ToolDefinition::new("show_menu", "Hiển thị thực đơn").with_example("cho xem menu");
        assert_eq!(
            tool.embedding_text().as_deref(),
            Some("Hiển thị thực đơn. cho xem menu")
        );
    }

    #[test]
    fn embedding_text_none_without_text() {
        let tool = ToolDefinition::new("noop", "  ");
        assert!(tool.embedding_text().is_none());
    }

    #[test]
    fn example_alias_is_accepted() {
        let tool: ToolDefinition =
            serde_json::from_value(json!({"name": "t", "example": "hi"})).unwrap();
        assert_eq!(tool.example_user_prompt, "hi");
    }

    #[test]
    fn parse_tools_skips_malformed_entries() {
        let doc = json!([
            {"name": "create_booking", "description": "Đặt bàn", "parameters": ["guests"]},
            {"description": "no name"},
            {"name": ""},
            42,
            {"name": "show_menu", "service": "MenuService"}
        ]);
        let tools = parse_tools(doc).unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["create_booking", "show_menu"]);
        assert_eq!(tools[1].service.as_deref(), Some("MenuService"));
    }

    #[test]
    fn parse_tools_rejects_non_array() {
        assert!(parse_tools(json!({"name": "x"})).is_err());
    }

    #[test]
    fn parameter_skeleton_has_null_values() {
        let m = ToolMatch {
            tool: ToolDefinition::new("create_booking", "d").with_parameters(["name", "guests"]),
            confidence: 0.8,
        };
        let skeleton = m.parameter_skeleton();
        assert_eq!(skeleton.len(), 2);
        assert_eq!(skeleton["guests"], serde_json::Value::Null);
    }
}
