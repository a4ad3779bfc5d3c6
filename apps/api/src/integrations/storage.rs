//! # Object Storage
//!
//! Write-once blob store for exported reports. Every object gets a random
//! name, so concurrent writers never collide and nothing needs locking.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, warn};
use uuid::Uuid;

use super::IntegrationError;

/// Stores bytes and returns a URL clients can fetch them from.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, IntegrationError>;
}

/// Random object name: `{prefix}_{uuid}.{extension}`.
pub fn unique_name(prefix: &str, extension: &str) -> String {
    format!("{}_{}.{}", prefix, Uuid::new_v4(), extension)
}

/// Files under a local directory, served back at `public_base_url`.
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        LocalObjectStorage {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn put(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, IntegrationError> {
        // Names come from unique_name; anything path-like is refused
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(IntegrationError::unavailable(
                "storage",
                format!("refusing object name '{}'", name),
            ));
        }

        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            warn!(root = ?self.root, error = %e, "Cannot create storage directory");
            IntegrationError::unavailable("storage", e.to_string())
        })?;

        let path = self.root.join(name);
        let size = bytes.len();
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| IntegrationError::unavailable("storage", e.to_string()))?;

        debug!(?path, size, content_type = %content_type, "Object stored");
        Ok(format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            name
        ))
    }
}
