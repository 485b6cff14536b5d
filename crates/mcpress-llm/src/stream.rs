//! Stream Reassembly
//!
//! Vendor-neutral streaming events plus the reassembler that turns raw
//! SSE bytes into them. The reassembler accumulates content and tool-call
//! fragments as it goes, so when the wire goes quiet it can hand back the
//! same consolidated result a buffered call would have produced.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

use mcpress_core::error::{ChatError, Result};
use mcpress_core::message::{CompletionResult, ToolCall, ToolCallDelta, ToolCallFunctionDelta};

use crate::sse::FrameDecoder;

/// One normalized event observed while a completion streams.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A content fragment, for progressive display.
    Delta(String),
    /// Partial tool calls from one vendor chunk, exactly as fragmented on
    /// the wire.
    ToolCallDeltas(Vec<ToolCallDelta>),
    /// A vendor-reported failure inside a 2xx stream.
    Error(String),
}

/// Which wire dialect a vendor stream speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDialect {
    /// OpenAI-style `choices[].delta` chunks; also spoken by OpenRouter
    /// and every compatible server.
    OpenAi,
    /// Gemini `candidates[].content.parts` chunks, which carry whole
    /// function calls rather than fragments.
    Gemini,
}

/// Accumulates tool-call fragments, keyed by their positional index.
///
/// OpenAI-style streams open a call with its id and name, then drip the
/// `arguments` JSON across many chunks. Ids and names are taken from the
/// first chunk that supplies a non-empty value; argument fragments are
/// appended in arrival order.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    slots: BTreeMap<u32, PendingToolCall>,
}

#[derive(Debug, Default)]
struct PendingToolCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one delta in.
    pub fn apply(&mut self, delta: &ToolCallDelta) {
        let slot = self.slots.entry(delta.index).or_default();
        if let Some(id) = delta.id.as_deref() {
            if !id.is_empty() {
                slot.id = Some(id.to_string());
            }
        }
        let Some(function) = &delta.function else {
            return;
        };
        if let Some(name) = function.name.as_deref() {
            if !name.is_empty() {
                slot.name = Some(name.to_string());
            }
        }
        if let Some(fragment) = function.arguments.as_deref() {
            slot.arguments.push_str(fragment);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Consolidated calls in index order. A call that never received an
    /// id gets the positional `call_{index}` form.
    pub fn finish(self) -> Vec<ToolCall> {
        self.slots
            .into_iter()
            .map(|(index, slot)| {
                ToolCall::function(
                    slot.id.unwrap_or_else(|| format!("call_{}", index)),
                    slot.name.unwrap_or_default(),
                    slot.arguments,
                )
            })
            .collect()
    }
}

/// Reassembles one vendor SSE stream into [`StreamEvent`]s and a final
/// consolidated [`CompletionResult`].
///
/// All state lives here rather than in the transport, so tests can drive
/// it with raw byte slices.
#[derive(Debug)]
pub struct StreamReassembler {
    dialect: StreamDialect,
    decoder: FrameDecoder,
    content: String,
    calls: ToolCallAccumulator,
    finished: bool,
}

impl StreamReassembler {
    pub fn new(dialect: StreamDialect) -> Self {
        Self {
            dialect,
            decoder: FrameDecoder::new(),
            content: String::new(),
            calls: ToolCallAccumulator::new(),
            finished: false,
        }
    }

    /// Feed one network read; returns normalized events in vendor order.
    /// The `[DONE]` sentinel is swallowed, and frames arriving after it
    /// are ignored.
    pub fn on_bytes(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        for payload in self.decoder.push(bytes) {
            if self.finished {
                break;
            }
            if payload == "[DONE]" {
                self.finished = true;
                continue;
            }
            self.on_payload(&payload, &mut events);
        }
        events
    }

    /// The consolidated result of everything fed so far. Streamed content
    /// is always a string, empty when the vendor sent none.
    pub fn finalize(self) -> CompletionResult {
        CompletionResult {
            content: Some(self.content),
            tool_calls: self.calls.finish(),
            raw: None,
        }
    }

    fn on_payload(&mut self, payload: &str, events: &mut Vec<StreamEvent>) {
        let value: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(err) => {
                debug!(error = %err, "skipping unparseable stream frame");
                return;
            }
        };
        if let Some(message) = vendor_error(&value) {
            events.push(StreamEvent::Error(message));
            return;
        }
        match self.dialect {
            StreamDialect::OpenAi => self.on_openai_chunk(&value, events),
            StreamDialect::Gemini => self.on_gemini_chunk(&value, events),
        }
    }

    fn on_openai_chunk(&mut self, value: &Value, events: &mut Vec<StreamEvent>) {
        let Some(delta) = value.pointer("/choices/0/delta") else {
            return;
        };
        if let Some(text) = delta.get("content").and_then(Value::as_str) {
            if !text.is_empty() {
                self.content.push_str(text);
                events.push(StreamEvent::Delta(text.to_string()));
            }
        }
        let Some(raw_calls) = delta.get("tool_calls") else {
            return;
        };
        match serde_json::from_value::<Vec<ToolCallDelta>>(raw_calls.clone()) {
            Ok(deltas) if !deltas.is_empty() => {
                for delta in &deltas {
                    self.calls.apply(delta);
                }
                events.push(StreamEvent::ToolCallDeltas(deltas));
            }
            Ok(_) => {}
            Err(err) => debug!(error = %err, "skipping malformed tool_calls chunk"),
        }
    }

    /// Gemini streams whole `functionCall` parts, never fragments, so each
    /// one becomes a fresh slot with a synthesized positional index and id.
    fn on_gemini_chunk(&mut self, value: &Value, events: &mut Vec<StreamEvent>) {
        let Some(parts) = value
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
        else {
            return;
        };
        for part in parts {
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                if !text.is_empty() {
                    self.content.push_str(text);
                    events.push(StreamEvent::Delta(text.to_string()));
                }
            }
            if let Some(call) = part.get("functionCall") {
                let name = call.get("name").and_then(Value::as_str).unwrap_or_default();
                let args = call.get("args").cloned().unwrap_or_else(|| json!({}));
                let index = self.calls.len() as u32;
                let delta = ToolCallDelta {
                    index,
                    id: Some(format!("call_{}", index)),
                    function: Some(ToolCallFunctionDelta {
                        name: Some(name.to_string()),
                        arguments: Some(args.to_string()),
                    }),
                };
                self.calls.apply(&delta);
                events.push(StreamEvent::ToolCallDeltas(vec![delta]));
            }
        }
    }
}

/// Vendor error envelope inside a stream frame: `{"error": {"message":
/// ...}}` or `{"error": "..."}`.
fn vendor_error(value: &Value) -> Option<String> {
    let error = value.get("error")?;
    if let Some(text) = error.as_str() {
        return Some(text.to_string());
    }
    Some(
        error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| "provider reported an unspecified error".to_string()),
    )
}

/// Drain a vendor SSE response through a reassembler, forwarding live
/// events, and return the consolidated result.
///
/// A closed receiver means the downstream client went away; the vendor
/// response is dropped right away, which releases the connection. A
/// vendor error envelope aborts the stream with the vendor's message.
pub(crate) async fn pump_stream(
    response: reqwest::Response,
    dialect: StreamDialect,
    tx: mpsc::Sender<StreamEvent>,
) -> Result<CompletionResult> {
    use futures::StreamExt;

    let mut reassembler = StreamReassembler::new(dialect);
    let mut body = response.bytes_stream();
    'read: while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| ChatError::transport(format!("stream read failed: {}", e)))?;
        for event in reassembler.on_bytes(&chunk) {
            if let StreamEvent::Error(message) = event {
                return Err(ChatError::bad_response(message));
            }
            if tx.send(event).await.is_err() {
                debug!("stream receiver dropped, abandoning upstream read");
                break 'read;
            }
        }
    }
    Ok(reassembler.finalize())
}
