pub mod client;

pub use client::{ChunkStream, UpstreamClient};

use std::sync::Arc;

use crate::config::UpstreamSettings;
use crate::error::ConfigError;

/// Result of the one-time upstream construction at startup.
#[derive(Clone)]
pub enum UpstreamHandle {
    Configured(Arc<UpstreamClient>),
    Unconfigured(ConfigError),
}

impl UpstreamHandle {
    pub fn from_settings(settings: &UpstreamSettings) -> Self {
        match UpstreamClient::new(settings) {
            Ok(client) => Self::Configured(Arc::new(client)),
            Err(e) => {
                tracing::warn!("Upstream disabled: {}", e);
                Self::Unconfigured(e)
            }
        }
    }

    pub fn client(&self) -> Result<&Arc<UpstreamClient>, ConfigError> {
        match self {
            Self::Configured(client) => Ok(client),
            Self::Unconfigured(e) => Err(e.clone()),
        }
    }

    pub async fn close(&self) {
        if let Self::Configured(client) = self {
            client.close().await;
        }
    }
}
