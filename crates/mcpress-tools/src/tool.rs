//! Core Tool trait and types
//!
//! Defines the interface every executable tool implements. Tools take
//! already-parsed JSON arguments and return a JSON value; argument
//! parsing, error wrapping, and result serialization all happen in the
//! registry, so implementations stay small.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use mcpress_core::message::ToolSchema;

/// One capability the assistant can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name; this is what the model calls.
    fn name(&self) -> &str;

    /// Human-readable description, surfaced to the model verbatim.
    fn description(&self) -> &str;

    /// JSON schema of the accepted arguments.
    fn input_schema(&self) -> Value;

    /// Execute with already-parsed arguments.
    async fn execute(&self, args: Value) -> Result<Value>;

    /// The schema advertised to providers for this tool.
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.input_schema(),
        }
    }
}

/// Shared handle for dynamic dispatch over tools.
pub type BoxedTool = Arc<dyn Tool>;

/// Closure-backed tool, handy for tests and one-off capabilities.
#[derive(Clone)]
pub struct SimpleTool {
    name: String,
    description: String,
    schema: Value,
    handler: Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>,
}

impl SimpleTool {
    pub fn new<F>(name: &str, description: &str, schema: Value, handler: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            schema,
            handler: Arc::new(handler),
        }
    }
}

#[async_trait]
impl Tool for SimpleTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        (self.handler)(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn simple_tool_runs_its_handler() {
        let tool = SimpleTool::new(
            "echo",
            "Echo arguments back",
            json!({"type": "object"}),
            Ok,
        );

        assert_eq!(tool.name(), "echo");
        let result = tool.execute(json!({"msg": "hello"})).await.unwrap();
        assert_eq!(result, json!({"msg": "hello"}));
    }

    #[test]
    fn schema_carries_name_description_and_parameters() {
        let tool = SimpleTool::new("noop", "Does nothing", json!({"type": "object"}), Ok);
        let schema = tool.schema();
        assert_eq!(schema.name, "noop");
        assert_eq!(schema.description, "Does nothing");
        assert_eq!(schema.parameters, json!({"type": "object"}));
    }
}
