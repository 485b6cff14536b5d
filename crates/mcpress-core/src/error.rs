//! Error types for mcpress

use thiserror::Error;

/// Main error type for chat, provider, and tool operations.
///
/// Every failure that can reach the HTTP boundary is one of these variants;
/// the `Display` text is what callers see in `{success: false, message}`.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    #[error("Invalid provider: {0}")]
    InvalidProvider(String),

    #[error("Could not reach the provider: {0}")]
    Transport(String),

    #[error("Provider request failed ({status}): {message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("Bad provider response: {0}")]
    BadProviderResponse(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Invalid request: {0}")]
    MalformedInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our ChatError type
pub type Result<T> = std::result::Result<T, ChatError>;

impl ChatError {
    /// Create a missing-configuration error
    pub fn config_missing(msg: impl Into<String>) -> Self {
        ChatError::ConfigMissing(msg.into())
    }

    /// Create an invalid-provider error
    pub fn invalid_provider(msg: impl Into<String>) -> Self {
        ChatError::InvalidProvider(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        ChatError::Transport(msg.into())
    }

    /// Create an upstream HTTP error carrying the vendor's status and message
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        ChatError::UpstreamStatus {
            status,
            message: message.into(),
        }
    }

    /// Create a bad-provider-response error
    pub fn bad_response(msg: impl Into<String>) -> Self {
        ChatError::BadProviderResponse(msg.into())
    }

    /// Create a tool-not-found error
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        ChatError::ToolNotFound(name.into())
    }

    /// Create a tool-execution error
    pub fn tool_execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ChatError::ToolExecution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a malformed-input error
    pub fn malformed(msg: impl Into<String>) -> Self {
        ChatError::MalformedInput(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ChatError::Internal(msg.into())
    }

    /// HTTP status for surfacing this error at the API boundary.
    ///
    /// Client-fixable input problems map to 400; everything upstream or
    /// internal maps to 500.
    pub fn status_code(&self) -> u16 {
        match self {
            ChatError::MalformedInput(_) | ChatError::InvalidProvider(_) => 400,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        assert_eq!(ChatError::malformed("missing messages").status_code(), 400);
        assert_eq!(ChatError::invalid_provider("nope").status_code(), 400);
    }

    #[test]
    fn upstream_errors_map_to_500() {
        assert_eq!(ChatError::transport("dns failure").status_code(), 500);
        assert_eq!(ChatError::upstream(429, "rate limited").status_code(), 500);
        assert_eq!(ChatError::config_missing("api_key").status_code(), 500);
        assert_eq!(ChatError::tool_not_found("get_weather").status_code(), 500);
    }

    #[test]
    fn upstream_status_display_carries_status_and_message() {
        let err = ChatError::upstream(503, "overloaded");
        assert_eq!(err.to_string(), "Provider request failed (503): overloaded");
    }

    #[test]
    fn tool_execution_display_names_the_tool() {
        let err = ChatError::tool_execution("create_post", "title required");
        assert_eq!(err.to_string(), "Tool 'create_post' failed: title required");
    }
}
