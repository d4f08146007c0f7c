//! Inbound API key check
//! Accepts `Authorization: Bearer <key>` or `Authorization: <key>`

use axum::http::{header, HeaderMap};

use crate::error::ProxyError;

pub const MISSING_KEY: &str = "Missing API key. Please provide Authorization header with Bearer token.";
pub const INVALID_KEY: &str = "Invalid API key";
pub const KEY_NOT_CONFIGURED: &str = "API key not configured on server";

#[derive(Clone)]
pub struct SecurityConfig {
    pub api_key: String,
}

impl SecurityConfig {
    pub fn verify(&self, headers: &HeaderMap) -> Result<(), ProxyError> {
        if self.api_key.is_empty() {
            return Err(ProxyError::ServerMisconfigured(KEY_NOT_CONFIGURED.to_string()));
        }

        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(extract_token)
            .unwrap_or_default();

        if token.is_empty() {
            return Err(ProxyError::Unauthorized(MISSING_KEY.to_string()));
        }
        if token != self.api_key {
            return Err(ProxyError::Unauthorized(INVALID_KEY.to_string()));
        }
        Ok(())
    }
}

/// The scheme is matched case-insensitively (`bearer`, `BEARER`, ...).
fn extract_token(value: &str) -> &str {
    match value.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("Bearer ") => value[7..].trim(),
        _ => value.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn security() -> SecurityConfig {
        SecurityConfig {
            api_key: "sk-secret".to_string(),
        }
    }

    fn headers(auth: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(v) = auth {
            headers.insert(header::AUTHORIZATION, HeaderValue::from_static(v));
        }
        headers
    }

    #[test]
    fn accepts_bearer_and_bare_key() {
        assert!(security().verify(&headers(Some("Bearer sk-secret"))).is_ok());
        assert!(security().verify(&headers(Some("sk-secret"))).is_ok());
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert!(security().verify(&headers(Some("bearer sk-secret"))).is_ok());
        assert!(security().verify(&headers(Some("BEARER sk-secret"))).is_ok());
        assert!(matches!(
            security().verify(&headers(Some("bearer wrong"))),
            Err(ProxyError::Unauthorized(msg)) if msg == INVALID_KEY
        ));
    }

    #[test]
    fn missing_header_is_unauthorized() {
        match security().verify(&headers(None)) {
            Err(ProxyError::Unauthorized(msg)) => assert_eq!(msg, MISSING_KEY),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            security().verify(&headers(Some("Bearer "))),
            Err(ProxyError::Unauthorized(msg)) if msg == MISSING_KEY
        ));
    }

    #[test]
    fn wrong_key_is_unauthorized() {
        assert!(matches!(
            security().verify(&headers(Some("wrong-value"))),
            Err(ProxyError::Unauthorized(msg)) if msg == INVALID_KEY
        ));
    }

    #[test]
    fn unset_key_is_a_server_error() {
        let security = SecurityConfig { api_key: String::new() };
        assert!(matches!(
            security.verify(&headers(Some("Bearer anything"))),
            Err(ProxyError::ServerMisconfigured(_))
        ));
    }
}
