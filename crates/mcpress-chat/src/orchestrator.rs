//! Conversation Orchestrator
//!
//! One turn of the suggest-confirm-execute-resume protocol. The first
//! completion either answers directly or suggests tool calls; suggested
//! calls travel back to the client and nothing executes until they
//! return with an explicit verdict. Confirmed calls run in order with
//! per-call failure isolation, then a second completion turns their
//! results into the final answer.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use mcpress_core::error::{ChatError, Result};
use mcpress_core::message::{ChatMessage, CompletionResult, ToolCall, ToolChoice};
use mcpress_llm::provider::ToolResultMode;
use mcpress_llm::registry::ProviderRegistry;
use mcpress_llm::stream::StreamEvent;
use mcpress_tools::registry::ToolRegistry;

use crate::prompt::SystemPromptSource;
use crate::types::{
    ConfirmationPayload, TurnEvent, TurnOutcome, DECLINE_MESSAGE, NO_FOLLOW_UP_MESSAGE,
};

/// Buffer for provider-to-client event forwarding.
const EVENT_BUFFER: usize = 100;

/// Drives conversation turns against whatever provider is current.
///
/// Holds no conversation state; everything it needs arrives with the
/// call.
pub struct ChatOrchestrator {
    providers: Arc<ProviderRegistry>,
    tools: Arc<ToolRegistry>,
    prompt: Arc<dyn SystemPromptSource>,
}

impl ChatOrchestrator {
    pub fn new(
        providers: Arc<ProviderRegistry>,
        tools: Arc<ToolRegistry>,
        prompt: Arc<dyn SystemPromptSource>,
    ) -> Self {
        Self {
            providers,
            tools,
            prompt,
        }
    }

    /// Seed for a fresh conversation: the system message plus the
    /// greeting the UI shows without any model call.
    pub async fn init_conversation(&self) -> (Vec<ChatMessage>, String) {
        let system = ChatMessage::system(self.prompt.system_prompt().await);
        let greeting = self.prompt.initial_greeting().await;
        (vec![system], greeting)
    }

    /// Run one buffered turn.
    ///
    /// Tool calls in the completion do not execute here; they come back
    /// as [`TurnOutcome::NeedsConfirmation`] and run only through
    /// [`ChatOrchestrator::resume_with_tools`] after the user agrees.
    pub async fn run_turn(&self, messages: Vec<ChatMessage>) -> Result<TurnOutcome> {
        let messages = self.prepare(messages).await?;
        let schemas = self.tools.schemas().await;
        let result = self
            .providers
            .send_chat(messages.clone(), schemas, ToolChoice::Auto, &HashMap::new())
            .await?;
        Ok(self.decide(result, messages))
    }

    /// Same decision as [`ChatOrchestrator::run_turn`], but first-completion
    /// events flow through `tx` as the vendor produces them.
    pub async fn run_turn_streaming(
        &self,
        messages: Vec<ChatMessage>,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<TurnOutcome> {
        let messages = self.prepare(messages).await?;
        let schemas = self.tools.schemas().await;
        let result = self
            .providers
            .stream_chat(messages.clone(), schemas, ToolChoice::Auto, &HashMap::new(), tx)
            .await?;
        Ok(self.decide(result, messages))
    }

    /// Run one full streaming turn, pushing every client-facing event
    /// through `tx`. The sequence always terminates with
    /// [`TurnEvent::Done`]; a failed turn emits [`TurnEvent::Error`] right
    /// before it. A closed channel means the client went away, and the
    /// turn winds down quietly.
    pub async fn stream_turn(&self, messages: Vec<ChatMessage>, tx: mpsc::Sender<TurnEvent>) {
        let (provider_tx, mut provider_rx) = mpsc::channel(EVENT_BUFFER);
        let forward_tx = tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = provider_rx.recv().await {
                let event = match event {
                    StreamEvent::Delta(text) => TurnEvent::Delta(text),
                    StreamEvent::ToolCallDeltas(deltas) => TurnEvent::ToolCallDeltas(deltas),
                    StreamEvent::Error(message) => TurnEvent::Error(message),
                };
                if forward_tx.send(event).await.is_err() {
                    // Receiver gone; dropping provider_rx stops the feed.
                    return;
                }
            }
        });

        let outcome = self.run_turn_streaming(messages, provider_tx).await;
        // Live events all precede the consolidated outcome.
        let _ = forwarder.await;
        match outcome {
            Ok(TurnOutcome::Reply { .. }) => {}
            Ok(TurnOutcome::NeedsConfirmation {
                tool_calls,
                messages,
            }) => {
                let payload = ConfirmationPayload::new(tool_calls, messages);
                let _ = tx.send(TurnEvent::ToolCalls(payload)).await;
            }
            Err(err) => {
                warn!(error = %err, "streaming turn failed");
                let _ = tx.send(TurnEvent::Error(err.to_string())).await;
            }
        }
        let _ = tx.send(TurnEvent::Done).await;
    }

    /// Execute confirmed tool calls and get the follow-up answer.
    ///
    /// `confirmed == false` acknowledges the decline and executes
    /// nothing. Failures are isolated per call: an unknown tool or a
    /// failed execution becomes that call's result text while its
    /// siblings still run.
    pub async fn resume_with_tools(
        &self,
        tool_calls: Vec<ToolCall>,
        messages: Vec<ChatMessage>,
        confirmed: bool,
    ) -> Result<String> {
        if tool_calls.is_empty() {
            return Err(ChatError::malformed("no tool calls to execute"));
        }
        if !confirmed {
            info!("user declined tool execution");
            return Ok(DECLINE_MESSAGE.to_string());
        }

        let mut messages = self.prepare(messages).await?;
        let results = self.execute_calls(&tool_calls).await;
        self.append_results(&mut messages, &tool_calls, results).await;

        let schemas = self.tools.schemas().await;
        let result = self
            .providers
            .send_chat(messages, schemas, ToolChoice::Auto, &HashMap::new())
            .await?;
        let content = result.content_or_empty();
        if content.trim().is_empty() {
            debug!("follow-up completion was empty, using placeholder");
            Ok(NO_FOLLOW_UP_MESSAGE.to_string())
        } else {
            Ok(content.to_string())
        }
    }

    /// Validate the incoming history and prepend the system prompt when
    /// it carries none.
    async fn prepare(&self, mut messages: Vec<ChatMessage>) -> Result<Vec<ChatMessage>> {
        if messages.is_empty() {
            return Err(ChatError::malformed("conversation history is empty"));
        }
        if !messages.iter().any(|m| m.is_system()) {
            messages.insert(0, ChatMessage::system(self.prompt.system_prompt().await));
        }
        Ok(messages)
    }

    fn decide(&self, result: CompletionResult, mut messages: Vec<ChatMessage>) -> TurnOutcome {
        if !result.has_tool_calls() {
            return TurnOutcome::Reply {
                content: result.content_or_empty().to_string(),
            };
        }
        let tool_calls = result.tool_calls.clone();
        debug!(count = tool_calls.len(), "model suggested tool calls");
        let mut assistant = ChatMessage::assistant_tool_calls(tool_calls.clone());
        if let Some(content) = result.content.filter(|c| !c.is_empty()) {
            assistant.content = Some(content);
        }
        messages.push(assistant);
        TurnOutcome::NeedsConfirmation {
            tool_calls,
            messages,
        }
    }

    /// Run each call in order. A failure only poisons its own slot.
    async fn execute_calls(&self, tool_calls: &[ToolCall]) -> Vec<String> {
        let mut results = Vec::with_capacity(tool_calls.len());
        for call in tool_calls {
            let name = call.function.name.as_str();
            let args = call.parsed_arguments();
            let result = match self.tools.execute(name, args).await {
                Ok(text) => text,
                Err(err) => {
                    warn!(tool = name, error = %err, "tool call failed");
                    err.to_string()
                }
            };
            results.push(result);
        }
        results
    }

    /// Feed results back into the history the way the current provider
    /// accepts them.
    async fn append_results(
        &self,
        messages: &mut Vec<ChatMessage>,
        tool_calls: &[ToolCall],
        results: Vec<String>,
    ) {
        match self.providers.tool_result_mode().await {
            ToolResultMode::ToolRole => {
                for (call, result) in tool_calls.iter().zip(results) {
                    messages.push(ChatMessage::tool_result(call.id.clone(), result));
                }
            }
            ToolResultMode::UserSummary => {
                let mut summary = String::from("Tool results:\n");
                for (call, result) in tool_calls.iter().zip(results) {
                    summary.push_str(&format!("- {}: {}\n", call.function.name, result));
                }
                messages.push(ChatMessage::user(summary));
            }
        }
    }
}
