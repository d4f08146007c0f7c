use std::path::Path;

use gonka_core::config::{default_config_path, Config};
use gonka_core::proxy::RequestSigner;

pub async fn run(config: Config) -> anyhow::Result<()> {
    println!("Gonka Proxy Status");
    println!("==================");
    println!();
    println!("Configuration:");
    println!("  Config file: {}", describe_source(config.source.as_deref()));
    println!("  Static dir: {:?}", config.server.static_dir);
    println!();
    println!("Server settings:");
    println!("  Host: {}", config.server.host);
    println!("  Port: {}", config.server.port);
    println!("  API key: {}", mask(&config.auth.api_key));
    println!();

    let upstream = &config.upstream;
    println!("Upstream:");
    println!("  Endpoint: {}", or_unset(&upstream.endpoint));
    println!("  Requester address: {}", or_unset(&upstream.address));
    println!("  Provider address: {}", or_unset(&upstream.provider_address));
    println!("  Timeout: {}s", upstream.timeout_secs);
    if upstream.private_key.is_empty() {
        println!("  Public key: (unset)");
    } else {
        match RequestSigner::from_hex(&upstream.private_key) {
            Ok(signer) => println!("  Public key: {}", signer.public_key_hex()),
            Err(e) => println!("  Public key: {}", e),
        }
    }
    let missing = upstream.missing();
    if !missing.is_empty() {
        println!("  Missing: {}", missing.join(", "));
    }

    // Check if server is reachable
    println!();
    let host = if config.server.host == "0.0.0.0" { "127.0.0.1" } else { config.server.host.as_str() };
    let url = format!("http://{}:{}/health", host, config.server.port);
    match reqwest::get(&url).await {
        Ok(resp) if resp.status().is_success() => {
            println!("Server: RUNNING ✓");
        }
        _ => {
            println!("Server: NOT RUNNING");
        }
    }

    Ok(())
}

fn describe_source(source: Option<&Path>) -> String {
    match source {
        Some(path) => path.display().to_string(),
        None => format!("(none; defaults and environment, searched {})", default_config_path().display()),
    }
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() { "(unset)" } else { value }
}

fn mask(secret: &str) -> String {
    match secret.chars().count() {
        0 => "(unset)".to_string(),
        n if n <= 6 => "*".repeat(n),
        _ => {
            let head: String = secret.chars().take(3).collect();
            format!("{}…{}", head, "*".repeat(4))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_secrets() {
        assert_eq!(mask(""), "(unset)");
        assert_eq!(mask("abc"), "***");
        assert_eq!(mask("sk-1234567890"), "sk-…****");
    }

    #[test]
    fn reports_the_file_actually_loaded() {
        let loaded = Path::new("/etc/gonka/custom.toml");
        assert_eq!(describe_source(Some(loaded)), "/etc/gonka/custom.toml");
        assert!(describe_source(None).starts_with("(none;"));
    }
}
