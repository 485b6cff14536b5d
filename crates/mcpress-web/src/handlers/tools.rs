//! Tool Listing Handler

use axum::extract::State;
use axum::response::Response;
use serde_json::json;

use crate::handlers::success;
use crate::state::SharedState;

/// GET /api/tools
pub async fn list_tools_handler(State(state): State<SharedState>) -> Response {
    let tools = state.tools.schemas().await;
    success(json!({ "tools": tools }))
}
