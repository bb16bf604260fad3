use std::path::PathBuf;

use crate::imagorpath::normalize::{normalize, SafeCharsType};
use crate::storage::storage::{Blob, ImageStorage};
use axum::async_trait;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use tokio::fs;

/// Filesystem-backed `ImageStorage`, for local development and tests in
/// place of S3/GCS. Keys are normalized the same way as the cloud backends
/// so a result-cache hash maps to the same relative path regardless of which
/// backend is configured.
#[derive(Clone)]
pub struct FileStorage {
    pub base_dir: PathBuf,
    pub path_prefix: String,
    pub safe_chars: SafeCharsType,
}

impl FileStorage {
    pub fn new(base_dir: PathBuf, path_prefix: String, safe_chars: SafeCharsType) -> Self {
        FileStorage {
            base_dir,
            path_prefix,
            safe_chars,
        }
    }

    pub fn get_full_path(&self, key: &str) -> PathBuf {
        let safe_key = normalize(key, &self.safe_chars);
        self.base_dir.join(&self.path_prefix).join(safe_key)
    }
}

#[async_trait]
impl ImageStorage for FileStorage {
    #[tracing::instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Blob> {
        let full_path = self.get_full_path(key);
        let data = fs::read(&full_path)
            .await
            .wrap_err_with(|| format!("failed to read {}", full_path.display()))?;
        Ok(Blob::new(data))
    }

    #[tracing::instrument(skip(self, blob))]
    async fn put(&self, key: &str, blob: &Blob) -> Result<()> {
        let full_path = self.get_full_path(key);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .wrap_err_with(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&full_path, &blob.data)
            .await
            .wrap_err_with(|| format!("failed to write {}", full_path.display()))?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<()> {
        let full_path = self.get_full_path(key);
        fs::remove_file(&full_path)
            .await
            .wrap_err_with(|| format!("failed to delete {}", full_path.display()))?;
        Ok(())
    }
}
