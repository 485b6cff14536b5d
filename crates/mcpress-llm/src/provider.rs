//! Provider Interface
//!
//! The traits and request types every vendor adapter implements. Adapters
//! own their wire formats end to end; the rest of the system only ever
//! sees [`ChatRequest`] going in and
//! [`mcpress_core::CompletionResult`] coming out.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use mcpress_core::error::{ChatError, Result};
use mcpress_core::message::{ChatMessage, CompletionResult, ToolChoice, ToolSchema};
use mcpress_core::options::ProviderOptions;

use crate::stream::StreamEvent;

/// One configurable field in a provider's options schema.
///
/// Fields describe what can be configured, never current values; secrets
/// stay out of every listing surface.
#[derive(Debug, Clone, Serialize)]
pub struct OptionField {
    pub key: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub secret: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
}

impl OptionField {
    pub fn new(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            required: false,
            secret: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn with_default(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }
}

/// How a provider wants tool results fed back into the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolResultMode {
    /// `tool`-role messages keyed by `tool_call_id`, the OpenAI
    /// convention.
    #[default]
    ToolRole,
    /// A single user-role summary naming each tool and its output, for
    /// providers that reject the `tool` role outright.
    UserSummary,
}

/// Everything an adapter needs for one completion call.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSchema>,
    pub tool_choice: ToolChoice,
    pub options: ProviderOptions,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = choice;
        self
    }

    pub fn with_options(mut self, options: ProviderOptions) -> Self {
        self.options = options;
        self
    }
}

/// A chat completion backend.
///
/// Implementations must be stateless with respect to conversations:
/// every call carries the full history, and nothing may be remembered
/// between calls beyond connection pooling.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Stable identifier, e.g. `"openai"`.
    fn id(&self) -> &str;

    /// Human-readable name for admin surfaces.
    fn label(&self) -> &str;

    /// The fields this provider can be configured with. The registry
    /// overlays persisted values and per-call overrides on the declared
    /// defaults.
    fn option_fields(&self) -> Vec<OptionField>;

    /// How this provider accepts tool results in the history.
    fn tool_result_mode(&self) -> ToolResultMode {
        ToolResultMode::ToolRole
    }

    /// Buffered completion: send the whole conversation, get the whole
    /// answer.
    async fn send_chat(&self, request: &ChatRequest) -> Result<CompletionResult>;

    /// Streaming capability, when the adapter has one. Callers fall back
    /// to [`ChatProvider::send_chat`] on `None`.
    fn as_streaming(&self) -> Option<&dyn StreamingChatProvider> {
        None
    }
}

/// Streaming side of a provider.
#[async_trait]
pub trait StreamingChatProvider: Send + Sync {
    /// Perform one completion, pushing normalized events through `tx` as
    /// vendor chunks arrive, and return the consolidated result. The
    /// result must match what [`ChatProvider::send_chat`] would have
    /// produced for the same vendor response.
    ///
    /// A closed receiver means the client went away; implementations
    /// stop reading and drop the vendor connection instead of erroring.
    async fn stream_chat(
        &self,
        request: &ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<CompletionResult>;
}

/// Shared handle for dynamic dispatch over providers.
pub type BoxedChatProvider = Arc<dyn ChatProvider>;

/// Listing entry for one registered provider.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub id: String,
    pub label: String,
    pub current: bool,
    pub option_fields: Vec<OptionField>,
}

/// Turn a non-2xx vendor reply into an error carrying the vendor's own
/// message. Vendors wrap failures as `{"error": {"message": ...}}` or
/// `{"error": "..."}`; anything else falls back to a generic message so
/// raw bodies never reach users.
pub(crate) fn upstream_error(status: u16, body: &str) -> ChatError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            let error = value.get("error")?;
            if let Some(text) = error.as_str() {
                return Some(text.to_string());
            }
            error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("provider returned HTTP {status}"));
    ChatError::upstream(status, message)
}
