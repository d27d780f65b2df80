//! Image Storage Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::ImageStorage,
};
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Directory-backed image storage
///
/// Each upload is written to `<root>/<path>` and addressed by a `file://`
/// URL. Intended for desktop builds and local development where no object
/// storage service is available.
pub struct LocalImageStorage {
    root: PathBuf,
}

impl LocalImageStorage {
    /// Create storage rooted at the platform data directory
    pub fn new() -> Self {
        let root = dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("bookshelf-core")
            .join("images");
        Self { root }
    }

    /// Create storage rooted at a custom directory
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if path.is_empty() || escapes {
            return Err(BridgeError::Upload(format!("invalid image path: {}", path)));
        }
        Ok(self.root.join(relative))
    }
}

impl Default for LocalImageStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageStorage for LocalImageStorage {
    async fn upload(&self, path: &str, data: Bytes) -> Result<String> {
        if data.is_empty() {
            return Err(BridgeError::Upload("image data is empty".to_string()));
        }
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| BridgeError::Upload(e.to_string()))?;
        }
        fs::write(&target, &data)
            .await
            .map_err(|e| BridgeError::Upload(e.to_string()))?;

        debug!(path, bytes = data.len(), "Stored image");
        Ok(format!("file://{}", target.display()))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }
}
