use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Proxy configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub upstream: UpstreamSettings,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// File the values were read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Directory holding the web chat interface (`index.html` and assets)
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            static_dir: default_static_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Key inbound callers must present. Empty means the server is misconfigured.
    #[serde(default)]
    pub api_key: String,
}

/// Signing credentials and endpoint of the single upstream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamSettings {
    /// secp256k1 secret scalar, hex, optional `0x` prefix
    #[serde(default)]
    pub private_key: String,

    /// Requester address sent as `X-Requester-Address`
    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub endpoint: String,

    /// Counterparty address folded into every signed message
    #[serde(default)]
    pub provider_address: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            private_key: String::new(),
            address: String::new(),
            endpoint: String::new(),
            provider_address: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl UpstreamSettings {
    /// Names of the environment variables that still need a value.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.private_key.is_empty() {
            missing.push(ENV_PRIVATE_KEY);
        }
        if self.address.is_empty() {
            missing.push(ENV_ADDRESS);
        }
        if self.endpoint.is_empty() {
            missing.push(ENV_ENDPOINT);
        }
        if self.provider_address.is_empty() {
            missing.push(ENV_PROVIDER_ADDRESS);
        }
        missing
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub const ENV_PRIVATE_KEY: &str = "GONKA_PRIVATE_KEY";
pub const ENV_ADDRESS: &str = "GONKA_ADDRESS";
pub const ENV_ENDPOINT: &str = "GONKA_ENDPOINT";
pub const ENV_PROVIDER_ADDRESS: &str = "GONKA_PROVIDER_ADDRESS";
pub const ENV_TIMEOUT_SECS: &str = "GONKA_TIMEOUT_SECS";
pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";
pub const ENV_STATIC_DIR: &str = "STATIC_DIR";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

// Default value functions
fn default_port() -> u16 { 8000 }
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_static_dir() -> PathBuf { PathBuf::from("static") }
fn default_timeout_secs() -> u64 { 60 }
fn default_log_level() -> String { "info".to_string() }

impl Config {
    /// Overlay values from the environment. Empty variables are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_PRIVATE_KEY) {
            self.upstream.private_key = v;
        }
        if let Some(v) = get(ENV_ADDRESS) {
            self.upstream.address = v;
        }
        if let Some(v) = get(ENV_ENDPOINT) {
            self.upstream.endpoint = v;
        }
        if let Some(v) = get(ENV_PROVIDER_ADDRESS) {
            self.upstream.provider_address = v;
        }
        if let Some(v) = get(ENV_TIMEOUT_SECS) {
            match v.trim().parse() {
                Ok(secs) => self.upstream.timeout_secs = secs,
                Err(e) => tracing::warn!("Ignoring {}={:?}: {}", ENV_TIMEOUT_SECS, v, e),
            }
        }
        if let Some(v) = get(ENV_API_KEY) {
            self.auth.api_key = v;
        }
        if let Some(v) = get(ENV_HOST) {
            self.server.host = v;
        }
        if let Some(v) = get(ENV_PORT) {
            match v.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(e) => tracing::warn!("Ignoring {}={:?}: {}", ENV_PORT, v, e),
            }
        }
        if let Some(v) = get(ENV_STATIC_DIR) {
            self.server.static_dir = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_LOG_LEVEL) {
            self.logging.level = v;
        }
    }
}

/// Get default config file path
/// Uses ~/.config/gonka-proxy/config.toml for Unix-like CLI experience
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("gonka-proxy")
        .join("config.toml")
}

/// Load config from file (or defaults), then overlay the process environment.
///
/// File lookup order:
/// 1. Specified path (if provided, must exist)
/// 2. ./config.toml (if exists)
/// 3. default_config_path() (usually ~/.config/gonka-proxy/config.toml)
pub fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    let mut config = load_config_file(path)?;
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

fn load_config_file(path: Option<PathBuf>) -> anyhow::Result<Config> {
    if let Some(config_path) = path {
        if config_path.exists() {
            return read_config_file(config_path);
        } else {
            anyhow::bail!("Specified config file not found: {:?}", config_path);
        }
    }

    // Try current directory config.toml
    let local_config = PathBuf::from("config.toml");
    if local_config.exists() {
        match std::fs::read_to_string(&local_config) {
            Ok(content) => {
                match toml::from_str::<Config>(&content) {
                    Ok(mut config) => {
                        config.source = Some(local_config);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::error!("Failed to parse ./config.toml: {}. Falling back to default path.", e);
                    }
                }
            }
            Err(e) => {
                tracing::error!("Failed to read ./config.toml: {}. Falling back to default path.", e);
            }
        }
    }

    let default_path = default_config_path();
    if default_path.exists() {
        read_config_file(default_path)
    } else {
        Ok(Config::default())
    }
}

fn read_config_file(path: PathBuf) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(&path)?;
    let mut config: Config = toml::from_str(&content)?;
    config.source = Some(path);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_match_service_expectations() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.upstream.timeout_secs, 60);
        assert!(config.auth.api_key.is_empty());
        assert_eq!(config.upstream.missing().len(), 4);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config: Config = toml::from_str(
            r#"
            [server]
            port = 9000

            [upstream]
            endpoint = "http://from-file"
            "#,
        )
        .unwrap();
        let vars = env(&[
            ("GONKA_ENDPOINT", "http://from-env"),
            ("PORT", "8123"),
            ("API_KEY", "sk-test"),
        ]);
        config.apply_env(|k| vars.get(k).cloned());

        assert_eq!(config.upstream.endpoint, "http://from-env");
        assert_eq!(config.server.port, 8123);
        assert_eq!(config.auth.api_key, "sk-test");
    }

    #[test]
    fn empty_and_unparsable_env_values_are_ignored() {
        let mut config = Config::default();
        let vars = env(&[("GONKA_ADDRESS", "  "), ("PORT", "not-a-port")]);
        config.apply_env(|k| vars.get(k).cloned());

        assert!(config.upstream.address.is_empty());
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn missing_lists_only_absent_settings_in_order() {
        let settings = UpstreamSettings {
            address: "gonka1requester".to_string(),
            provider_address: "gonka1provider".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.missing(), vec!["GONKA_PRIVATE_KEY", "GONKA_ENDPOINT"]);
    }

    #[test]
    fn explicit_config_file_is_reported_as_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gonka.toml");
        std::fs::write(&path, "[server]\nport = 9100\n").unwrap();

        let config = load_config_file(Some(path.clone())).unwrap();
        assert_eq!(config.source, Some(path));
        assert_eq!(config.server.port, 9100);
    }

    #[test]
    fn missing_explicit_config_file_is_an_error() {
        let result = load_config(Some(PathBuf::from("/nonexistent/gonka-proxy.toml")));
        assert!(result.is_err());
    }
}
