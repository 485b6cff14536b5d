//! API Routes
//!
//! Everything lives under `/api`; the server nests this router and adds
//! the middleware stack around it.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::SharedState;

/// Create the `/api` route group.
pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/chat", post(handlers::chat::chat_handler))
        .route("/chat-init", get(handlers::chat::chat_init_handler))
        .route("/execute-tool", post(handlers::chat::execute_tool_handler))
        .route("/health", get(handlers::health::health_handler))
        .route("/providers", get(handlers::providers::list_providers_handler))
        .route("/provider", post(handlers::providers::switch_provider_handler))
        .route(
            "/provider/options",
            post(handlers::providers::set_provider_options_handler),
        )
        .route("/tools", get(handlers::tools::list_tools_handler))
}
