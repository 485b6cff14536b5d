//! Turn Types
//!
//! Outcomes and live events of one conversation turn, shared by the
//! buffered and streaming paths.

use serde::{Deserialize, Serialize};

use mcpress_core::message::{ChatMessage, ToolCall, ToolCallDelta};

/// Canned acknowledgment when the user declines suggested tool calls.
pub const DECLINE_MESSAGE: &str =
    "Okay, I won't run those tools. Is there anything else I can help you with?";

/// Placeholder reply when the follow-up completion comes back empty.
pub const NO_FOLLOW_UP_MESSAGE: &str =
    "The tools ran successfully, but I have nothing further to add.";

/// What one turn resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The model answered directly.
    Reply { content: String },
    /// The model wants tools run. Nothing executes until the user sends
    /// the calls back with an explicit verdict; `messages` is the history
    /// including the assistant turn that requested them, ready for that
    /// round trip.
    NeedsConfirmation {
        tool_calls: Vec<ToolCall>,
        messages: Vec<ChatMessage>,
    },
}

/// The confirmation request exactly as clients receive it, whether as a
/// JSON response body or as the `tool_calls` stream event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationPayload {
    pub tool_calls: Vec<ToolCall>,
    pub messages: Vec<ChatMessage>,
    pub requires_confirmation: bool,
}

impl ConfirmationPayload {
    pub fn new(tool_calls: Vec<ToolCall>, messages: Vec<ChatMessage>) -> Self {
        Self {
            tool_calls,
            messages,
            requires_confirmation: true,
        }
    }
}

/// One client-facing event of a streaming turn, in emission order.
///
/// Every stream terminates with `Done`; a failed turn emits `Error`
/// immediately before it.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// Content fragment from the live completion.
    Delta(String),
    /// Tool-call fragments exactly as the vendor chunked them.
    ToolCallDeltas(Vec<ToolCallDelta>),
    /// Consolidated suggestion; emitted after the vendor stream drains.
    ToolCalls(ConfirmationPayload),
    /// Turn failure, in user-presentable words.
    Error(String),
    /// Terminal marker, always last.
    Done,
}
