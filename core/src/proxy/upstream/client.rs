//! Upstream client for calling the Gonka API with signed requests

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::{header, redirect, Client, Method};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Duration;

use crate::config::UpstreamSettings;
use crate::error::{ConfigError, UpstreamError};
use crate::proxy::clock::HybridClock;
use crate::proxy::signer::{RequestSigner, SignedEnvelope};

pub const REQUESTER_ADDRESS_HEADER: &str = "X-Requester-Address";
pub const TIMESTAMP_HEADER: &str = "X-Timestamp";

/// Raw upstream chunks, yielded only after a success status was confirmed.
pub type ChunkStream = BoxStream<'static, Result<Bytes, UpstreamError>>;

pub struct UpstreamClient {
    http_client: RwLock<Option<Client>>,
    endpoint: String,
    address: header::HeaderValue,
    provider_address: String,
    signer: RequestSigner,
    clock: HybridClock,
}

impl UpstreamClient {
    /// Build the client from complete settings. Key and address problems are
    /// reported here, never per request.
    pub fn new(settings: &UpstreamSettings) -> Result<Self, ConfigError> {
        let missing = settings.missing();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let signer = RequestSigner::from_hex(&settings.private_key)?;
        let address = header::HeaderValue::from_str(settings.address.trim())
            .map_err(|e| ConfigError::InvalidAddress(e.to_string()))?;

        let endpoint = settings.endpoint.trim().trim_end_matches('/').to_string();
        reqwest::Url::parse(&endpoint)
            .map_err(|e| ConfigError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

        // connect and per-read timeouts so long SSE responses are not cut off;
        // a 3xx is an upstream error, never re-sent elsewhere with our signature
        let timeout = Duration::from_secs(settings.timeout_secs);
        let http_client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .redirect(redirect::Policy::none())
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .user_agent(concat!("gonka-proxy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        tracing::info!(
            "Upstream client ready: {} (requester {}, provider {})",
            endpoint,
            settings.address,
            settings.provider_address
        );

        Ok(Self {
            http_client: RwLock::new(Some(http_client)),
            endpoint,
            address,
            provider_address: settings.provider_address.trim().to_string(),
            signer,
            clock: HybridClock::new(),
        })
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn http(&self) -> Result<Client, UpstreamError> {
        self.http_client.read().await.clone().ok_or(UpstreamError::Closed)
    }

    /// Serialize, timestamp and sign a payload.
    pub fn prepare(&self, payload: &Value) -> Result<SignedEnvelope, UpstreamError> {
        let bytes = serde_json::to_vec(payload).map_err(UpstreamError::Encode)?;
        let timestamp_ns = self.clock.now_ns();
        Ok(self.signer.seal(bytes, timestamp_ns, &self.provider_address))
    }

    fn headers(&self, envelope: &SignedEnvelope) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        // base64 and decimal digits are always valid header values
        if let Ok(sig) = header::HeaderValue::from_str(&envelope.signature) {
            headers.insert(header::AUTHORIZATION, sig);
        }
        headers.insert(REQUESTER_ADDRESS_HEADER, self.address.clone());
        headers.insert(TIMESTAMP_HEADER, header::HeaderValue::from(envelope.timestamp_ns));
        headers
    }

    async fn send(
        &self,
        label: &str,
        method: Method,
        path: &str,
        payload: &Value,
    ) -> Result<reqwest::Response, UpstreamError> {
        let client = self.http().await?;
        let url = self.build_url(path);
        let envelope = self.prepare(payload)?;
        log_request(label, &method, &url, payload);

        let headers = self.headers(&envelope);
        client
            .request(method, &url)
            .headers(headers)
            .body(envelope.payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Gonka API {} failed: {}", label, e);
                UpstreamError::Transport(e)
            })
    }

    /// Signed request whose whole response body is read and decoded as JSON.
    pub async fn request_buffered(
        &self,
        method: Method,
        path: &str,
        payload: &Value,
    ) -> Result<Value, UpstreamError> {
        let response = self.send("Request", method, path, payload).await?;
        let status = response.status();

        if !status.is_success() {
            return Err(read_error("Error Response", response).await);
        }

        let body = response.bytes().await.map_err(|e| {
            tracing::error!("Gonka API Request failed while reading body: {}", e);
            UpstreamError::Transport(e)
        })?;
        serde_json::from_slice(&body).map_err(UpstreamError::Decode)
    }

    /// Signed request relayed chunk by chunk. Resolves only once the upstream
    /// has answered with a success status; error bodies are read in full.
    pub async fn request_streamed(
        &self,
        method: Method,
        path: &str,
        payload: &Value,
    ) -> Result<ChunkStream, UpstreamError> {
        let response = self.send("Stream Request", method, path, payload).await?;

        if !response.status().is_success() {
            return Err(read_error("Stream Error Response", response).await);
        }

        Ok(response
            .bytes_stream()
            .map_err(UpstreamError::Transport)
            .boxed())
    }

    /// Best-effort model listing; failures yield an empty list.
    pub async fn fetch_models(&self) -> Vec<Value> {
        match self
            .request_buffered(Method::GET, "/models", &Value::Object(Default::default()))
            .await
        {
            Ok(response) => {
                let models = match response.get("models") {
                    Some(Value::Array(models)) => models.clone(),
                    _ => Vec::new(),
                };
                tracing::info!("Loaded {} models from Gonka API", models.len());
                models
            }
            Err(e) => {
                tracing::warn!("Failed to load models from Gonka API: {}", e);
                Vec::new()
            }
        }
    }

    /// Release the connection pool. Safe to call more than once.
    pub async fn close(&self) {
        if self.http_client.write().await.take().is_some() {
            tracing::info!("Upstream client closed");
        }
    }
}

fn log_request(label: &str, method: &Method, url: &str, payload: &Value) {
    tracing::info!("Gonka API {}: {} {}", label, method, url);
    match serde_json::to_string_pretty(payload) {
        Ok(body) => tracing::info!("Request body: {}", body),
        Err(e) => tracing::warn!("Failed to log request body: {}", e),
    }
}

async fn read_error(label: &str, response: reqwest::Response) -> UpstreamError {
    let status = response.status().as_u16();
    let body = match response.bytes().await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::error!("Gonka API {}: {} (failed to read body: {})", label, status, e);
            return UpstreamError::Http {
                status,
                body: String::new(),
            };
        }
    };
    tracing::error!("Gonka API {}: {}", label, status);
    tracing::error!("Error response body: {}", body);
    UpstreamError::Http { status, body }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> UpstreamSettings {
        UpstreamSettings {
            private_key: "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318".into(),
            address: "gonka1requester".into(),
            endpoint: "http://127.0.0.1:9/v1/".into(),
            provider_address: "gonka1provider".into(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn rejects_incomplete_settings() {
        let mut s = settings();
        s.endpoint.clear();
        match UpstreamClient::new(&s) {
            Err(ConfigError::Missing(missing)) => assert_eq!(missing, vec!["GONKA_ENDPOINT"]),
            other => panic!("unexpected: {:?}", other.err()),
        }
    }

    #[test]
    fn rejects_bad_endpoint() {
        let mut s = settings();
        s.endpoint = "not a url".into();
        assert!(matches!(
            UpstreamClient::new(&s),
            Err(ConfigError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn trims_trailing_slash() {
        let client = UpstreamClient::new(&settings()).unwrap();
        assert_eq!(client.endpoint, "http://127.0.0.1:9/v1");
        assert_eq!(client.build_url("/models"), "http://127.0.0.1:9/v1/models");
    }

    #[test]
    fn headers_carry_the_signed_timestamp() {
        let client = UpstreamClient::new(&settings()).unwrap();
        let envelope = client.prepare(&serde_json::json!({"model": "x"})).unwrap();
        let headers = client.headers(&envelope);

        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers[header::AUTHORIZATION], envelope.signature.as_str());
        assert_eq!(headers[REQUESTER_ADDRESS_HEADER], "gonka1requester");
        assert_eq!(
            headers[TIMESTAMP_HEADER],
            envelope.timestamp_ns.to_string().as_str()
        );
        assert_eq!(envelope.payload, br#"{"model":"x"}"#);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_blocks_requests() {
        let client = UpstreamClient::new(&settings()).unwrap();
        client.close().await;
        client.close().await;
        assert!(client.http_client.read().await.is_none());

        let err = client
            .request_buffered(Method::POST, "/chat/completions", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Closed));
        assert!(client.fetch_models().await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_transport_error() {
        let client = UpstreamClient::new(&settings()).unwrap();
        let err = client
            .request_buffered(Method::GET, "/models", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Transport(_)));
    }
}
