//! OpenAI-compatible handler
//! Handles /v1/chat/completions, /v1/models and the unauthenticated /api/models

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, Method},
    response::{IntoResponse, Json, Response},
};
use futures::TryStreamExt;
use serde_json::{json, Value};

use crate::error::ProxyError;
use crate::proxy::server::AppState;
use crate::proxy::upstream::UpstreamClient;

pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Handle POST /v1/chat/completions
pub async fn handle_chat_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    state.security.verify(&headers)?;
    let client = state.upstream.client()?;

    let body: Value = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!("Failed to parse request JSON: {}", e);
        ProxyError::BadRequest(format!("Invalid JSON: {}", e))
    })?;

    tracing::info!("Incoming chat completions request");
    match serde_json::to_string_pretty(&body) {
        Ok(pretty) => tracing::info!("Request body: {}", pretty),
        Err(e) => tracing::warn!("Failed to log request body: {}", e),
    }

    if wants_stream(&body) {
        forward_streamed(client, &body).await
    } else {
        forward_buffered(client, &body).await
    }
}

/// `stream` is read for truthiness: `true`, non-zero numbers, non-empty
/// strings and collections select the SSE relay; absent or `null` does not.
fn wants_stream(body: &Value) -> bool {
    match body.get("stream") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

async fn forward_buffered(client: &UpstreamClient, body: &Value) -> Result<Response, ProxyError> {
    let response = client
        .request_buffered(Method::POST, CHAT_COMPLETIONS_PATH, body)
        .await
        .map_err(|e| {
            tracing::error!("Chat completions error: {}", e);
            ProxyError::Internal(e.to_string())
        })?;

    Ok(Json(response).into_response())
}

/// Relay upstream SSE bytes as they arrive. Errors after the first chunk can
/// only abort the connection; the status line is already on the wire.
async fn forward_streamed(client: &UpstreamClient, body: &Value) -> Result<Response, ProxyError> {
    let chunks = client
        .request_streamed(Method::POST, CHAT_COMPLETIONS_PATH, body)
        .await
        .map_err(|e| {
            tracing::error!("Chat completions error: {}", e);
            ProxyError::Internal(e.to_string())
        })?;

    let chunks = chunks.inspect_err(|e| tracing::error!("Streaming error: {}", e));

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(chunks))
        .map_err(|e| ProxyError::Internal(e.to_string()))
}

/// Handle GET /v1/models
pub async fn handle_list_models(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ProxyError> {
    state.security.verify(&headers)?;
    Ok(Json(state.models.openai_list()))
}

/// Handle GET /api/models (no auth, used by the web interface)
pub async fn handle_api_models(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "models": state.models.models() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_flag_defaults_to_buffered() {
        assert!(!wants_stream(&json!({"model": "x"})));
        assert!(!wants_stream(&json!({"stream": null})));
        assert!(!wants_stream(&json!({"stream": false})));
        assert!(wants_stream(&json!({"stream": true})));
    }

    #[test]
    fn stream_flag_accepts_truthy_values() {
        assert!(wants_stream(&json!({"stream": 1})));
        assert!(wants_stream(&json!({"stream": "yes"})));
        assert!(!wants_stream(&json!({"stream": 0})));
        assert!(!wants_stream(&json!({"stream": 0.0})));
        assert!(!wants_stream(&json!({"stream": ""})));
        assert!(!wants_stream(&json!({"stream": []})));
    }
}
