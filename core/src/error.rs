//! Error taxonomy shared by the upstream client and the HTTP handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Malformed or missing signing credentials / upstream settings.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error(
        "Gonka configuration incomplete. Missing: {}. GONKA_PROVIDER_ADDRESS is the Gonka provider \
         address (bech32 format), which can be obtained from the provider or in Gonka documentation.",
        .0.join(", ")
    )]
    Missing(Vec<&'static str>),

    #[error("Invalid GONKA_PRIVATE_KEY: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid GONKA_ADDRESS: {0}")]
    InvalidAddress(String),

    #[error("Invalid GONKA_ENDPOINT: {0}")]
    InvalidEndpoint(String),

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),
}

/// Failures talking to the upstream.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Upstream returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to serialize request payload: {0}")]
    Encode(serde_json::Error),

    #[error("Invalid JSON response from upstream: {0}")]
    Decode(serde_json::Error),

    #[error("Upstream client is closed")]
    Closed,
}

/// Errors surfaced to inbound callers.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    ServerMisconfigured(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ServerMisconfigured(_) | Self::Configuration(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_names_every_variable() {
        let err = ConfigError::Missing(vec!["GONKA_PRIVATE_KEY", "GONKA_ENDPOINT"]);
        let msg = err.to_string();
        assert!(msg.contains("Missing: GONKA_PRIVATE_KEY, GONKA_ENDPOINT."));
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            ProxyError::Unauthorized("Invalid API key".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ProxyError::BadRequest("Invalid JSON".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ProxyError::from(ConfigError::Missing(vec!["GONKA_ADDRESS"])).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn upstream_http_error_keeps_status() {
        let err = UpstreamError::Http {
            status: 402,
            body: "insufficient balance".into(),
        };
        assert_eq!(
            ProxyError::Internal(err.to_string()).to_string(),
            "Internal server error: Upstream returned HTTP 402: insufficient balance"
        );
    }
}
