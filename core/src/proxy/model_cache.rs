//! Startup snapshot of the upstream model list

use serde_json::{json, Value};

use crate::proxy::upstream::UpstreamHandle;

/// Placeholder `created` timestamp reported for every model.
pub const MODEL_CREATED: i64 = 1677610602;
pub const MODEL_OWNER: &str = "gonka";
pub const PLACEHOLDER_MODEL_ID: &str = "gonka-model";

/// Written once before the server accepts requests, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ModelCache {
    models: Vec<Value>,
}

impl ModelCache {
    pub fn new(models: Vec<Value>) -> Self {
        Self { models }
    }

    /// Populate from the upstream. Never fails: an unconfigured or unreachable
    /// upstream leaves the cache empty.
    pub async fn load(upstream: &UpstreamHandle) -> Self {
        match upstream.client() {
            Ok(client) => {
                let cache = Self::new(client.fetch_models().await);
                if cache.is_empty() {
                    tracing::warn!("No models loaded at startup; /v1/models will list a placeholder");
                } else {
                    tracing::info!("Successfully loaded {} models at startup", cache.models.len());
                }
                cache
            }
            Err(_) => {
                tracing::warn!("Gonka configuration incomplete, skipping model loading");
                Self::default()
            }
        }
    }

    pub fn models(&self) -> &[Value] {
        &self.models
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// OpenAI `GET /v1/models` body.
    pub fn openai_list(&self) -> Value {
        let mut data: Vec<Value> = self
            .models
            .iter()
            .map(|model| {
                let id = model.get("id").and_then(|v| v.as_str()).unwrap_or("unknown");
                openai_model(id)
            })
            .collect();

        if data.is_empty() {
            data.push(openai_model(PLACEHOLDER_MODEL_ID));
        }

        json!({
            "object": "list",
            "data": data
        })
    }
}

fn openai_model(id: &str) -> Value {
    json!({
        "id": id,
        "object": "model",
        "created": MODEL_CREATED,
        "owned_by": MODEL_OWNER
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cache_lists_placeholder() {
        let list = ModelCache::default().openai_list();
        assert_eq!(list["object"], "list");
        assert_eq!(list["data"].as_array().unwrap().len(), 1);
        assert_eq!(list["data"][0]["id"], PLACEHOLDER_MODEL_ID);
        assert_eq!(list["data"][0]["owned_by"], "gonka");
    }

    #[test]
    fn lists_cached_models_in_order() {
        let cache = ModelCache::new(vec![
            json!({"id": "Qwen/Qwen3-235B", "v_ram": 640}),
            json!({"name": "no-id"}),
        ]);
        let list = cache.openai_list();
        let data = list["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["id"], "Qwen/Qwen3-235B");
        assert_eq!(data[0]["created"], MODEL_CREATED);
        assert_eq!(data[1]["id"], "unknown");
    }

    #[tokio::test]
    async fn unconfigured_upstream_leaves_cache_empty() {
        let handle = UpstreamHandle::from_settings(&Default::default());
        assert!(ModelCache::load(&handle).await.is_empty());
    }
}
