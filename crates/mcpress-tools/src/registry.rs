//! Tool Registry
//!
//! Holds the executable tools in registration order and dispatches
//! model-requested calls to them. Lookup failures and tool failures map
//! to distinct errors so one bad call can be reported without discarding
//! the rest of a batch.

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use mcpress_core::error::{ChatError, Result};
use mcpress_core::message::ToolSchema;

use crate::tool::BoxedTool;

/// Ordered collection of executable tools.
///
/// Registration order is what providers see when schemas are advertised,
/// so it is preserved; a duplicate name is dropped and the first
/// registration wins.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<Vec<BoxedTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, tool: BoxedTool) {
        let mut tools = self.tools.write().await;
        if tools.iter().any(|existing| existing.name() == tool.name()) {
            warn!(tool = tool.name(), "duplicate tool registration ignored");
            return;
        }
        debug!(tool = tool.name(), "registered tool");
        tools.push(tool);
    }

    pub async fn get(&self, name: &str) -> Option<BoxedTool> {
        self.tools
            .read()
            .await
            .iter()
            .find(|tool| tool.name() == name)
            .cloned()
    }

    /// Schemas of every registered tool, in registration order.
    pub async fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.read().await.iter().map(|t| t.schema()).collect()
    }

    pub async fn schema(&self, name: &str) -> Option<ToolSchema> {
        self.get(name).await.map(|tool| tool.schema())
    }

    pub async fn list_names(&self) -> Vec<String> {
        self.tools
            .read()
            .await
            .iter()
            .map(|t| t.name().to_string())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.tools.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tools.read().await.is_empty()
    }

    /// Execute one named tool and serialize its result for a transcript
    /// message. Unknown names and failed executions come back as errors
    /// tagged with the tool, never as panics.
    pub async fn execute(&self, name: &str, args: Value) -> Result<String> {
        let tool = self
            .get(name)
            .await
            .ok_or_else(|| ChatError::tool_not_found(name))?;
        debug!(tool = name, "executing tool");
        let result = tool
            .execute(args)
            .await
            .map_err(|e| ChatError::tool_execution(name, e.to_string()))?;
        Ok(serialize_result(result))
    }
}

/// Tool output as transcript text. String results pass through untouched,
/// an object's `message` field wins when present, and everything else is
/// JSON-encoded.
fn serialize_result(value: Value) -> String {
    if let Value::String(text) = value {
        return text;
    }
    if let Some(message) = value.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    value.to_string()
}
