//! Backing file storage for uploaded obstacle images.

use crate::db::errors::{DbError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Trait for image file storage backends
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store file content under the given storage key
    async fn store(&self, storage_key: &str, content: &[u8]) -> Result<()>;

    /// Retrieve file content using storage key
    async fn retrieve(&self, storage_key: &str) -> Result<Vec<u8>>;

    /// Delete file content using storage key. Deleting a missing file is not
    /// an error.
    async fn delete(&self, storage_key: &str) -> Result<()>;

    /// Check if file exists using storage key
    async fn exists(&self, storage_key: &str) -> Result<bool>;
}

/// Local filesystem storage backend - stores files in the uploads directory,
/// which is served publicly under the uploads URL path.
pub struct LocalFileStorage {
    base_path: PathBuf,
}

impl LocalFileStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(&self, storage_key: &str, content: &[u8]) -> Result<()> {
        let full_path = self.base_path.join(storage_key);

        // Ensure parent directory exists
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(content).await?;
        file.sync_all().await?;

        Ok(())
    }

    async fn retrieve(&self, storage_key: &str) -> Result<Vec<u8>> {
        let full_path = self.base_path.join(storage_key);

        if !full_path.exists() {
            return Err(DbError::NotFound);
        }

        Ok(fs::read(&full_path).await?)
    }

    async fn delete(&self, storage_key: &str) -> Result<()> {
        let full_path = self.base_path.join(storage_key);

        if full_path.exists() {
            fs::remove_file(&full_path).await?;
        }

        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> Result<bool> {
        let full_path = self.base_path.join(storage_key);
        Ok(full_path.exists())
    }
}

/// Create the file storage backend, making sure the uploads directory exists
pub async fn create_file_storage(uploads_dir: &PathBuf) -> Result<Arc<dyn FileStorage>> {
    if let Err(e) = fs::create_dir_all(uploads_dir).await {
        return Err(DbError::Other(anyhow::anyhow!(
            "Failed to create uploads directory {:?}: {}",
            uploads_dir,
            e
        )));
    }
    Ok(Arc::new(LocalFileStorage::new(uploads_dir.clone())))
}
