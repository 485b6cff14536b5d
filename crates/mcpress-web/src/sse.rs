//! Turn events on the SSE wire.
//!
//! Each event becomes one `event:<type>` / `data:<json>` frame:
//! `delta` carries `{"content": fragment}`, `tool_call_delta` the
//! vendor's partial calls, `tool_calls` the full confirmation payload,
//! `error` carries `{"message": text}`, and `done` closes every stream
//! with `{}`.

use serde_json::json;

use mcpress_chat::TurnEvent;

/// Event name and JSON payload for one turn event.
pub fn frame(event: &TurnEvent) -> (&'static str, String) {
    match event {
        TurnEvent::Delta(content) => ("delta", json!({ "content": content }).to_string()),
        TurnEvent::ToolCallDeltas(deltas) => (
            "tool_call_delta",
            serde_json::to_string(deltas).unwrap_or_else(|_| "[]".to_string()),
        ),
        TurnEvent::ToolCalls(payload) => (
            "tool_calls",
            serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string()),
        ),
        TurnEvent::Error(message) => ("error", json!({ "message": message }).to_string()),
        TurnEvent::Done => ("done", "{}".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpress_chat::ConfirmationPayload;
    use mcpress_core::message::{ChatMessage, ToolCall};
    use serde_json::Value;

    #[test]
    fn delta_frames_wrap_the_fragment() {
        let (name, data) = frame(&TurnEvent::Delta("Hel".to_string()));
        assert_eq!(name, "delta");
        assert_eq!(data, r#"{"content":"Hel"}"#);
    }

    #[test]
    fn tool_calls_frame_carries_the_confirmation_payload() {
        let payload = ConfirmationPayload::new(
            vec![ToolCall::function("call_1", "get_site_info", "{}")],
            vec![ChatMessage::user("hi")],
        );
        let (name, data) = frame(&TurnEvent::ToolCalls(payload));
        assert_eq!(name, "tool_calls");
        let value: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(value["requires_confirmation"], Value::Bool(true));
        assert_eq!(value["tool_calls"][0]["function"]["name"], "get_site_info");
    }

    #[test]
    fn error_and_done_frames() {
        let (name, data) = frame(&TurnEvent::Error("boom".to_string()));
        assert_eq!(name, "error");
        assert_eq!(data, r#"{"message":"boom"}"#);

        let (name, data) = frame(&TurnEvent::Done);
        assert_eq!(name, "done");
        assert_eq!(data, "{}");
    }
}
