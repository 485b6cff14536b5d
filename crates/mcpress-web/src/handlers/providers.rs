//! Provider Management Handlers
//!
//! Listing never includes stored option values, so credentials stay
//! server-side; the `secret` flag on each field tells the UI to render a
//! write-only input.

use std::collections::HashMap;

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::handlers::{error_response, success};
use crate::state::SharedState;

/// GET /api/providers
pub async fn list_providers_handler(State(state): State<SharedState>) -> Response {
    let providers = state.providers.available_providers().await;
    success(json!({ "providers": providers }))
}

#[derive(Debug, Deserialize)]
pub struct SwitchProviderBody {
    pub provider: String,
}

/// POST /api/provider
pub async fn switch_provider_handler(
    State(state): State<SharedState>,
    Json(body): Json<SwitchProviderBody>,
) -> Response {
    match state.providers.set_current_provider(&body.provider).await {
        Ok(()) => {
            info!(provider = %body.provider, "switched provider");
            success(json!({ "provider": body.provider }))
        }
        Err(err) => error_response(&err),
    }
}

#[derive(Debug, Deserialize)]
pub struct ProviderOptionsBody {
    pub provider: String,
    pub values: HashMap<String, String>,
}

/// POST /api/provider/options
pub async fn set_provider_options_handler(
    State(state): State<SharedState>,
    Json(body): Json<ProviderOptionsBody>,
) -> Response {
    match state.providers.set_options(&body.provider, &body.values).await {
        Ok(()) => {
            info!(provider = %body.provider, count = body.values.len(), "stored provider options");
            success(json!({ "provider": body.provider }))
        }
        Err(err) => error_response(&err),
    }
}
