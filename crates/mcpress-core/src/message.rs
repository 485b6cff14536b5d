//! Normalized chat protocol types.
//!
//! Every provider adapter translates between its vendor wire format and
//! these types; nothing vendor-specific appears here. The full message
//! history travels with every request, so the server holds no conversation
//! state between turns.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const ROLE_SYSTEM: &str = "system";
pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";
pub const ROLE_TOOL: &str = "tool";

/// One entry in a conversation history.
///
/// `content` is absent on assistant messages that only carry tool calls;
/// `tool_call_id` is present only on `tool`-role result messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ROLE_SYSTEM.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ROLE_USER.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ROLE_ASSISTANT.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Assistant turn that requests tool invocations instead of replying.
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: ROLE_ASSISTANT.to_string(),
            content: None,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ROLE_TOOL.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == ROLE_SYSTEM
    }

    /// Message text, empty when the message carries none.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// A concrete tool invocation requested by the model.
///
/// `function.arguments` is a JSON-encoded string, not a parsed object; only
/// the executor parses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ToolCallFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: "function".to_string(),
            function: ToolCallFunction {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Parse the JSON-encoded arguments. A malformed or empty string parses
    /// as an empty object so one bad call cannot abort a batch.
    pub fn parsed_arguments(&self) -> Value {
        serde_json::from_str(&self.function.arguments).unwrap_or_else(|_| json!({}))
    }
}

/// A partial tool call carried by one streaming chunk.
///
/// Vendors key these by a positional `index`; fragments for the same index
/// are merged, with `arguments` appended rather than replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    #[serde(default)]
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<ToolCallFunctionDelta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallFunctionDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// Vendor-agnostic function-calling schema for one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// OpenAI-style function wrapper. Adapters with a different wire shape
    /// (Gemini's `functionDeclarations`) do their own remapping.
    pub fn to_wire(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters
            }
        })
    }
}

/// Tool choice directive for a completion request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ToolChoice {
    #[default]
    Auto,
    None,
    Required,
    Tool(String),
}

impl ToolChoice {
    /// OpenAI-compatible wire value.
    pub fn to_wire(&self) -> Value {
        match self {
            ToolChoice::Auto => json!("auto"),
            ToolChoice::None => json!("none"),
            ToolChoice::Required => json!("required"),
            ToolChoice::Tool(name) => json!({
                "type": "function",
                "function": {"name": name}
            }),
        }
    }
}

/// Normalized provider output.
///
/// `tool_calls` is always a Vec after normalization, never null or absent,
/// even when the vendor omitted the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl CompletionResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
            raw: None,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn content_or_empty(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_tool_calls_message_omits_empty_fields() {
        let msg = ChatMessage::assistant_tool_calls(vec![ToolCall::function(
            "call_0",
            "get_site_info",
            "{}",
        )]);
        let wire = serde_json::to_value(&msg).unwrap();
        assert_eq!(wire["role"], "assistant");
        assert!(wire.get("content").is_none());
        assert!(wire.get("tool_call_id").is_none());
        assert_eq!(wire["tool_calls"][0]["type"], "function");
        assert_eq!(wire["tool_calls"][0]["function"]["name"], "get_site_info");
    }

    #[test]
    fn tool_result_round_trips() {
        let msg = ChatMessage::tool_result("call_1", "done");
        let wire = serde_json::to_string(&msg).unwrap();
        let back: ChatMessage = serde_json::from_str(&wire).unwrap();
        assert_eq!(back.role, ROLE_TOOL);
        assert_eq!(back.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(back.text(), "done");
    }

    #[test]
    fn parsed_arguments_falls_back_to_empty_object() {
        let call = ToolCall::function("call_0", "list_posts", "{\"status\": \"publish\"}");
        assert_eq!(call.parsed_arguments()["status"], "publish");

        let truncated = ToolCall::function("call_1", "list_posts", "{\"status\":");
        assert_eq!(truncated.parsed_arguments(), json!({}));

        let empty = ToolCall::function("call_2", "list_posts", "");
        assert_eq!(empty.parsed_arguments(), json!({}));
    }

    #[test]
    fn tool_schema_wire_shape() {
        let schema = ToolSchema::new(
            "create_post",
            "Create a draft post",
            json!({"type": "object", "properties": {"title": {"type": "string"}}}),
        );
        let wire = schema.to_wire();
        assert_eq!(wire["type"], "function");
        assert_eq!(wire["function"]["name"], "create_post");
        assert_eq!(wire["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn tool_choice_wire_values() {
        assert_eq!(ToolChoice::Auto.to_wire(), json!("auto"));
        assert_eq!(ToolChoice::Required.to_wire(), json!("required"));
        assert_eq!(
            ToolChoice::Tool("get_site_info".to_string()).to_wire(),
            json!({"type": "function", "function": {"name": "get_site_info"}})
        );
    }

    #[test]
    fn completion_result_tool_calls_default_to_empty() {
        let parsed: CompletionResult = serde_json::from_str("{\"content\": \"hi\"}").unwrap();
        assert_eq!(parsed.content.as_deref(), Some("hi"));
        assert!(parsed.tool_calls.is_empty());
        assert!(!parsed.has_tool_calls());
    }

    #[test]
    fn delta_deserializes_partial_fields() {
        let delta: ToolCallDelta = serde_json::from_str(
            "{\"index\": 1, \"function\": {\"arguments\": \"\\\"}\"}}",
        )
        .unwrap();
        assert_eq!(delta.index, 1);
        assert!(delta.id.is_none());
        let function = delta.function.unwrap();
        assert!(function.name.is_none());
        assert_eq!(function.arguments.as_deref(), Some("\"}"));
    }
}
