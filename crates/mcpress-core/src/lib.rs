//! Core types and utilities shared across the mcpress workspace.
//!
//! # Modules
//!
//! - `access`: caller authorization seam
//! - `config`: environment configuration loading
//! - `error`: error taxonomy and Result alias
//! - `message`: normalized chat protocol types
//! - `options`: provider option storage

pub mod access;
pub mod config;
pub mod error;
pub mod message;
pub mod options;

// Re-exports
pub use access::{AccessGate, AllowAll, DenyAll};
pub use error::{ChatError, Result};
pub use message::{
    ChatMessage, CompletionResult, ToolCall, ToolCallDelta, ToolCallFunction,
    ToolCallFunctionDelta, ToolChoice, ToolSchema, ROLE_ASSISTANT, ROLE_SYSTEM, ROLE_TOOL,
    ROLE_USER,
};
pub use options::{FileOptionStore, MemoryOptionStore, OptionStore, ProviderOptions};
