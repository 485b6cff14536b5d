//! OpenRouter Provider
//!
//! OpenRouter fronts many models behind the OpenAI chat-completions
//! protocol, so the wire handling matches the OpenAI adapter. What it
//! adds is attribution: the optional `site_url` and `site_title` options
//! become the `HTTP-Referer` and `X-Title` headers OpenRouter uses to
//! credit traffic.

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

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "openrouter/auto";

const REQUEST_TIMEOUT_SECS: u64 = 120;

pub struct OpenRouterProvider {
    client: Client,
}

impl OpenRouterProvider {
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
        debug!(%endpoint, %model, stream, "sending openrouter chat completion");

        let mut call = self.client.post(endpoint).bearer_auth(api_key).json(&body);
        if let Some(site_url) = request.options.get("site_url") {
            call = call.header("HTTP-Referer", site_url);
        }
        if let Some(site_title) = request.options.get("site_title") {
            call = call.header("X-Title", site_title);
        }

        let response = call
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

impl Default for OpenRouterProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatProvider for OpenRouterProvider {
    fn id(&self) -> &str {
        "openrouter"
    }

    fn label(&self) -> &str {
        "OpenRouter"
    }

    fn option_fields(&self) -> Vec<OptionField> {
        vec![
            OptionField::new("api_key", "API key").required().secret(),
            OptionField::new("model", "Model").with_default(DEFAULT_MODEL),
            OptionField::new("endpoint", "API endpoint").with_default(DEFAULT_ENDPOINT),
            OptionField::new("site_url", "Site URL for attribution"),
            OptionField::new("site_title", "Site title for attribution"),
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
impl StreamingChatProvider for OpenRouterProvider {
    async fn stream_chat(
        &self,
        request: &ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<CompletionResult> {
        let response = self.post_completion(request, true).await?;
        pump_stream(response, StreamDialect::OpenAi, tx).await
    }
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
