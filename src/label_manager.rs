//! Label resolution with a local name-to-ID cache

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::client::MailClient;
use crate::error::{Result, TriageError};

/// Resolves display label names to Gmail label IDs, creating labels
/// that do not exist yet.
///
/// Gmail treats label names case-insensitively, so the cache is keyed
/// by lowercase name.
pub struct LabelManager {
    client: Arc<dyn MailClient>,
    label_cache: HashMap<String, String>, // lowercase name -> id
}

impl LabelManager {
    pub fn new(client: Arc<dyn MailClient>) -> Self {
        Self {
            client,
            label_cache: HashMap::new(),
        }
    }

    /// Load all existing labels into the cache.
    ///
    /// Call this once before resolving labels so existing ones are
    /// reused instead of recreated.
    pub async fn load_existing_labels(&mut self) -> Result<usize> {
        let labels = self.client.list_labels().await?;
        let count = labels.len();

        for label in labels {
            self.cache_insert(label.name, label.id);
        }

        info!("Loaded {} existing labels into cache", count);
        Ok(count)
    }

    fn cache_get(&self, name: &str) -> Option<&String> {
        self.label_cache.get(&name.to_lowercase())
    }

    fn cache_insert(&mut self, name: String, id: String) {
        self.label_cache.insert(name.to_lowercase(), id);
    }

    /// Get the label ID for `name`, creating the label if the account
    /// does not have it yet.
    pub async fn get_or_create_label(&mut self, name: &str) -> Result<String> {
        if let Some(id) = self.cache_get(name) {
            debug!("Label '{}' already exists in cache", name);
            return Ok(id.clone());
        }

        info!("Creating label: {}", name);

        let label_id = self.client.create_label(name).await.map_err(|e| {
            TriageError::LabelError(format!("Failed to create label '{}': {}", name, e))
        })?;

        self.cache_insert(name.to_string(), label_id.clone());

        info!("Created label '{}' with ID: {}", name, label_id);
        Ok(label_id)
    }
}
