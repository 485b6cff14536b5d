//! Gemini Provider
//!
//! Adapter for Google's Gemini `generateContent` API, whose wire format
//! shares nothing with the OpenAI one: roles are `user`/`model`/
//! `function`, the system prompt travels in a dedicated
//! `systemInstruction` block, tool declarations are camelCase
//! `functionDeclarations`, and tool traffic moves as `functionCall` /
//! `functionResponse` parts keyed by function name instead of call id.
//! This adapter owns that whole mapping in both directions.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

use mcpress_core::error::{ChatError, Result};
use mcpress_core::message::{ChatMessage, CompletionResult, ToolCall, ToolChoice, ROLE_ASSISTANT, ROLE_TOOL};

use crate::provider::{upstream_error, ChatProvider, ChatRequest, OptionField, StreamingChatProvider};
use crate::stream::{pump_stream, StreamDialect, StreamEvent};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const REQUEST_TIMEOUT_SECS: u64 = 120;

pub struct GeminiProvider {
    client: Client,
}

impl GeminiProvider {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    async fn post_generate(&self, request: &ChatRequest, stream: bool) -> Result<reqwest::Response> {
        let api_key = request.options.require("api_key")?;
        let endpoint = request.options.get_or("endpoint", DEFAULT_ENDPOINT);
        let model = request.options.get_or("model", DEFAULT_MODEL);
        let url = build_url(endpoint, model, api_key, stream);
        let body = build_request(request);
        // The URL carries the API key, so it stays out of the logs.
        debug!(%model, stream, "sending gemini generateContent");

        let response = self
            .client
            .post(&url)
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

impl Default for GeminiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn id(&self) -> &str {
        "gemini"
    }

    fn label(&self) -> &str {
        "Google Gemini"
    }

    fn option_fields(&self) -> Vec<OptionField> {
        vec![
            OptionField::new("api_key", "API key").required().secret(),
            OptionField::new("model", "Model").with_default(DEFAULT_MODEL),
            OptionField::new("endpoint", "API base URL").with_default(DEFAULT_ENDPOINT),
        ]
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<CompletionResult> {
        let response = self.post_generate(request, false).await?;
        let raw: Value = response
            .json()
            .await
            .map_err(|e| ChatError::bad_response(format!("invalid generateContent body: {}", e)))?;
        parse_completion(raw)
    }

    fn as_streaming(&self) -> Option<&dyn StreamingChatProvider> {
        Some(self)
    }
}

#[async_trait]
impl StreamingChatProvider for GeminiProvider {
    async fn stream_chat(
        &self,
        request: &ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<CompletionResult> {
        let response = self.post_generate(request, true).await?;
        pump_stream(response, StreamDialect::Gemini, tx).await
    }
}

fn build_url(endpoint: &str, model: &str, api_key: &str, stream: bool) -> String {
    let base = endpoint.trim_end_matches('/');
    if stream {
        format!("{}/models/{}:streamGenerateContent?alt=sse&key={}", base, model, api_key)
    } else {
        format!("{}/models/{}:generateContent?key={}", base, model, api_key)
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(rename = "toolConfig", skip_serializing_if = "Option::is_none")]
    tool_config: Option<GeminiToolConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiFunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: GeminiFunctionResponse,
    },
}

impl GeminiPart {
    fn text(text: impl Into<String>) -> Self {
        GeminiPart::Text { text: text.into() }
    }
}

#[derive(Debug, Serialize)]
struct GeminiFunctionCall {
    name: String,
    args: Value,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
struct GeminiTool {
    #[serde(rename = "functionDeclarations")]
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct GeminiToolConfig {
    #[serde(rename = "functionCallingConfig")]
    function_calling_config: GeminiFunctionCallingConfig,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionCallingConfig {
    mode: String,
}

fn build_request(request: &ChatRequest) -> GeminiRequest {
    let system_instruction = request
        .messages
        .iter()
        .find(|m| m.is_system())
        .map(|m| GeminiContent {
            role: "user".to_string(),
            parts: vec![GeminiPart::text(m.text())],
        });

    let mut contents = Vec::new();
    for message in &request.messages {
        if message.is_system() {
            continue;
        }
        match message.role.as_str() {
            ROLE_ASSISTANT => {
                let mut parts = Vec::new();
                if let Some(content) = message.content.as_deref() {
                    if !content.is_empty() {
                        parts.push(GeminiPart::text(content));
                    }
                }
                for call in message.tool_calls.iter().flatten() {
                    parts.push(GeminiPart::FunctionCall {
                        function_call: GeminiFunctionCall {
                            name: call.function.name.clone(),
                            args: call.parsed_arguments(),
                        },
                    });
                }
                if !parts.is_empty() {
                    contents.push(GeminiContent {
                        role: "model".to_string(),
                        parts,
                    });
                }
            }
            ROLE_TOOL => {
                let name = message
                    .tool_call_id
                    .as_deref()
                    .map(|id| resolve_function_name(&request.messages, id))
                    .unwrap_or_default();
                contents.push(GeminiContent {
                    role: "function".to_string(),
                    parts: vec![GeminiPart::FunctionResponse {
                        function_response: GeminiFunctionResponse {
                            name,
                            response: json!({"result": message.text()}),
                        },
                    }],
                });
            }
            _ => contents.push(GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart::text(message.text())],
            }),
        }
    }

    let tools = if request.tools.is_empty() {
        None
    } else {
        Some(vec![GeminiTool {
            function_declarations: request
                .tools
                .iter()
                .map(|tool| GeminiFunctionDeclaration {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                })
                .collect(),
        }])
    };
    let tool_config = tools.as_ref().map(|_| GeminiToolConfig {
        function_calling_config: GeminiFunctionCallingConfig {
            mode: mode_for(&request.tool_choice).to_string(),
        },
    });

    GeminiRequest {
        contents,
        system_instruction,
        tools,
        tool_config,
    }
}

/// Gemini keys tool results by function name, not call id. The name is
/// recovered from whichever assistant turn in the history requested the
/// matching id; the raw id is the fallback when nothing matches.
fn resolve_function_name(messages: &[ChatMessage], tool_call_id: &str) -> String {
    messages
        .iter()
        .filter(|m| m.role == ROLE_ASSISTANT)
        .filter_map(|m| m.tool_calls.as_ref())
        .flatten()
        .find(|call| call.id == tool_call_id)
        .map(|call| call.function.name.clone())
        .unwrap_or_else(|| tool_call_id.to_string())
}

fn mode_for(choice: &ToolChoice) -> &'static str {
    match choice {
        ToolChoice::Auto => "AUTO",
        ToolChoice::None => "NONE",
        // Gemini has no per-function pinning; ANY forces some call.
        ToolChoice::Required | ToolChoice::Tool(_) => "ANY",
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiCandidateContent>,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, rename = "functionCall")]
    function_call: Option<GeminiResponseFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

fn parse_completion(raw: Value) -> Result<CompletionResult> {
    let response: GeminiResponse = serde_json::from_value(raw.clone())
        .map_err(|e| ChatError::bad_response(format!("unexpected generateContent shape: {}", e)))?;
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::bad_response("response carried no candidates"))?;
    let Some(content) = candidate.content else {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "unknown".to_string());
        return Err(ChatError::bad_response(format!(
            "candidate carried no content (finish reason: {})",
            reason
        )));
    };

    let mut text = String::new();
    let mut tool_calls: Vec<ToolCall> = Vec::new();
    for part in content.parts {
        if let Some(piece) = part.text {
            text.push_str(&piece);
        }
        if let Some(call) = part.function_call {
            let args = if call.args.is_null() { json!({}) } else { call.args };
            tool_calls.push(ToolCall::function(
                format!("call_{}", tool_calls.len()),
                call.name,
                args.to_string(),
            ));
        }
    }
    Ok(CompletionResult {
        content: if text.is_empty() { None } else { Some(text) },
        tool_calls,
        raw: Some(raw),
    })
}
