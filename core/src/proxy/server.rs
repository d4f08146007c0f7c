//! Proxy Server - Axum HTTP server

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::proxy::auth::SecurityConfig;
use crate::proxy::handlers::openai;
use crate::proxy::model_cache::ModelCache;
use crate::proxy::upstream::UpstreamHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub upstream: UpstreamHandle,
    pub models: Arc<ModelCache>,
    pub security: Arc<SecurityConfig>,
}

impl AppState {
    pub fn new(upstream: UpstreamHandle, models: ModelCache, api_key: String) -> Self {
        Self {
            upstream,
            models: Arc::new(models),
            security: Arc::new(SecurityConfig { api_key }),
        }
    }

    /// Construct the upstream once and load the model list before serving.
    pub async fn bootstrap(config: &Config) -> Self {
        let upstream = UpstreamHandle::from_settings(&config.upstream);
        let models = ModelCache::load(&upstream).await;
        Self::new(upstream, models, config.auth.api_key.clone())
    }
}

/// Build the router. Static assets are only mounted when `static_dir` exists.
pub fn build_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        // Health check
        .route("/healthz", get(health_check_handler))
        .route("/health", get(health_check_handler))

        // OpenAI-compatible endpoints
        .route("/v1/chat/completions", post(openai::handle_chat_completions))
        .route("/v1/models", get(openai::handle_list_models))

        // Web interface
        .route("/api/models", get(openai::handle_api_models));

    if let Some(dir) = static_dir.filter(|d| d.is_dir()) {
        app = app
            .route_service("/", ServeFile::new(dir.join("index.html")))
            .nest_service("/static", ServeDir::new(dir));
    }

    app.layer(DefaultBodyLimit::max(100 * 1024 * 1024)) // 100MB
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Proxy server instance
pub struct ProxyServer {
    config: Config,
}

impl ProxyServer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the proxy server (blocking)
    pub async fn run(self) -> anyhow::Result<()> {
        let state = AppState::bootstrap(&self.config).await;
        let upstream = state.upstream.clone();
        let app = build_router(state, Some(&self.config.server.static_dir));

        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        tracing::info!("Proxy server listening on {}", addr);

        // Handle graceful shutdown
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        upstream.close().await;
        tracing::info!("Proxy server stopped");
        served?;
        Ok(())
    }
}

/// Health check handler
async fn health_check_handler() -> Response {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
