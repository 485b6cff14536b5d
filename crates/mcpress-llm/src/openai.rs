//! OpenAI Provider
//!
//! Adapter for the OpenAI chat-completions API and every server that
//! speaks the same protocol. The `endpoint` option points it at
//! compatible backends (Groq, Together, vLLM, llama.cpp, ...) without
//! any code changes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

use mcpress_core::error::{ChatError, Result};
use mcpress_core::message::{CompletionResult, ToolCall};

use crate::provider::{upstream_error, ChatProvider, ChatRequest, OptionField, StreamingChatProvider};
use crate::stream::{pump_stream, StreamDialect, StreamEvent};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const REQUEST_TIMEOUT_SECS: u64 = 120;

pub struct OpenAiProvider {
    client: Client,
}

impl OpenAiProvider {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    async fn post_completion(&self, request: &ChatRequest, stream: bool) -> Result<reqwest::Response> {
        let api_key = request.options.require("api_key")?;
        let endpoint = request.options.get_or("endpoint", DEFAULT_ENDPOINT);
        let model = request.options.get_or("model", DEFAULT_MODEL);
        let body = build_body(request, model, stream);
        debug!(%endpoint, %model, stream, "sending openai chat completion");

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream_error(status.as_u16(), &body));
        }
        Ok(response)
    }
}

impl Default for OpenAiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn id(&self) -> &str {
        "openai"
    }

    fn label(&self) -> &str {
        "OpenAI"
    }

    fn option_fields(&self) -> Vec<OptionField> {
        vec![
            OptionField::new("api_key", "API key").required().secret(),
            OptionField::new("model", "Model").with_default(DEFAULT_MODEL),
            OptionField::new("endpoint", "API endpoint").with_default(DEFAULT_ENDPOINT),
        ]
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<CompletionResult> {
        let response = self.post_completion(request, false).await?;
        let raw: Value = response
            .json()
            .await
            .map_err(|e| ChatError::bad_response(format!("invalid completion body: {}", e)))?;
        parse_completion(raw)
    }

    fn as_streaming(&self) -> Option<&dyn StreamingChatProvider> {
        Some(self)
    }
}

#[async_trait]
impl StreamingChatProvider for OpenAiProvider {
    async fn stream_chat(
        &self,
        request: &ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<CompletionResult> {
        let response = self.post_completion(request, true).await?;
        pump_stream(response, StreamDialect::OpenAi, tx).await
    }
}

fn build_body(request: &ChatRequest, model: &str, stream: bool) -> Value {
    let mut body = json!({
        "model": model,
        "messages": request.messages,
    });
    if !request.tools.is_empty() {
        body["tools"] = Value::Array(request.tools.iter().map(|t| t.to_wire()).collect());
        body["tool_choice"] = request.tool_choice.to_wire();
    }
    if stream {
        body["stream"] = json!(true);
    }
    body
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

fn parse_completion(raw: Value) -> Result<CompletionResult> {
    let response: ApiResponse = serde_json::from_value(raw.clone())
        .map_err(|e| ChatError::bad_response(format!("unexpected completion shape: {}", e)))?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::bad_response("completion carried no choices"))?;
    Ok(CompletionResult {
        content: choice.message.content,
        tool_calls: choice.message.tool_calls,
        raw: Some(raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpress_core::message::{ChatMessage, ToolChoice, ToolSchema};

    fn request_with_tools() -> ChatRequest {
        ChatRequest::new(vec![
            ChatMessage::system("You help run a site."),
            ChatMessage::user("What's here?"),
        ])
        .with_tools(vec![ToolSchema {
            name: "get_site_info".to_string(),
            description: "Basic site facts".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }])
    }

    #[test]
    fn body_includes_tools_only_when_present() {
        let bare = build_body(&ChatRequest::new(vec![ChatMessage::user("hi")]), "m", false);
        assert!(bare.get("tools").is_none());
        assert!(bare.get("tool_choice").is_none());
        assert!(bare.get("stream").is_none());

        let with_tools = build_body(&request_with_tools(), "gpt-4o-mini", true);
        assert_eq!(with_tools["model"], "gpt-4o-mini");
        assert_eq!(with_tools["tools"][0]["type"], "function");
        assert_eq!(with_tools["tools"][0]["function"]["name"], "get_site_info");
        assert_eq!(with_tools["tool_choice"], "auto");
        assert_eq!(with_tools["stream"], true);
    }

    #[test]
    fn body_serializes_required_tool_choice() {
        let body = build_body(
            &request_with_tools().with_tool_choice(ToolChoice::Required),
            "m",
            false,
        );
        assert_eq!(body["tool_choice"], "required");
    }

    #[test]
    fn parse_completion_reads_content_and_calls() {
        let raw = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "list_posts", "arguments": "{\"count\":2}"}
                    }]
                }
            }]
        });
        let result = parse_completion(raw).unwrap();
        assert!(result.content.is_none());
        assert_eq!(result.tool_calls.len(), 1);
        assert_eq!(result.tool_calls[0].function.name, "list_posts");
        assert!(result.raw.is_some());
    }

    #[test]
    fn parse_completion_rejects_missing_choices() {
        let err = parse_completion(json!({"choices": []})).unwrap_err();
        assert!(matches!(err, ChatError::BadProviderResponse(_)));
    }

    #[test]
    fn option_fields_declare_auth_and_defaults() {
        let provider = OpenAiProvider::new();
        let fields = provider.option_fields();
        let api_key = fields.iter().find(|f| f.key == "api_key").unwrap();
        assert!(api_key.required && api_key.secret);
        let endpoint = fields.iter().find(|f| f.key == "endpoint").unwrap();
        assert_eq!(endpoint.default, Some(DEFAULT_ENDPOINT));
    }

    #[tokio::test]
    async fn send_chat_requires_api_key() {
        let provider = OpenAiProvider::new();
        let err = provider
            .send_chat(&ChatRequest::new(vec![ChatMessage::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::ConfigMissing(_)));
    }
}
