use gonka_core::config::Config;
use gonka_core::proxy::ProxyServer;

pub async fn run(mut config: Config, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    // Apply CLI overrides if provided
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(host) = host {
        config.server.host = host;
    }

    tracing::info!("Starting Gonka Proxy...");
    tracing::info!("  Port: {}", config.server.port);
    tracing::info!("  Host: {}", config.server.host);
    tracing::info!("  Static dir: {:?}", config.server.static_dir);

    let missing = config.upstream.missing();
    if missing.is_empty() {
        tracing::info!("  Upstream: {}", config.upstream.endpoint);
    } else {
        tracing::warn!("Upstream configuration incomplete, missing: {}", missing.join(", "));
        tracing::warn!("The proxy will start but chat requests will fail until these are set.");
    }
    if config.auth.api_key.is_empty() {
        tracing::warn!("API_KEY is not set; authenticated endpoints will return 500.");
    }

    tracing::info!("Proxy server starting on http://{}:{}", config.server.host, config.server.port);
    tracing::info!("Press Ctrl+C to stop");

    // Run server (blocks until shutdown)
    ProxyServer::new(config).run().await?;

    Ok(())
}
