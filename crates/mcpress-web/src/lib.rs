//! mcpress-web: HTTP surface for the mcpress chat service.
//!
//! All routes are JSON under `/api`:
//!
//! ```text
//! POST /api/chat             one conversation turn (SSE when requested)
//! GET  /api/chat-init        conversation seed + greeting
//! POST /api/execute-tool     run confirmed tool calls, final answer
//! GET  /api/health           liveness, version, uptime
//! GET  /api/providers        registered providers and option fields
//! POST /api/provider         switch the current provider
//! POST /api/provider/options persist provider option values
//! GET  /api/tools            registered tool schemas
//! ```
//!
//! Responses carry `success: true` plus payload fields, or
//! `success: false` with a `message` and a 400/500 status. Streaming
//! responses are SSE frames named `delta`, `tool_call_delta`,
//! `tool_calls`, `error`, and `done`.

pub mod handlers;
pub mod routes;
pub mod server;
pub mod sse;
pub mod state;

pub use routes::api_router;
pub use server::{RateLimitConfig, ServerConfig, WebServer};
pub use state::{AppState, SharedState};
