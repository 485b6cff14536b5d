//! HTTP Request Handlers

pub mod chat;
pub mod health;
pub mod providers;
pub mod tools;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use mcpress_core::error::ChatError;

/// `{success:true}` merged with the payload's own fields.
pub(crate) fn success(mut payload: Value) -> Response {
    if let Some(object) = payload.as_object_mut() {
        object.insert("success".to_string(), Value::Bool(true));
    }
    Json(payload).into_response()
}

/// `{success:false, message}` with the taxonomy's status mapping.
pub(crate) fn error_response(err: &ChatError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({ "success": false, "message": err.to_string() })),
    )
        .into_response()
}

/// 403 for callers the access gate refuses.
pub(crate) fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "success": false, "message": "access denied" })),
    )
        .into_response()
}
