use axum::async_trait;
use color_eyre::Result;

pub use crate::processor::blob::Blob;

/// Storage backend contract: fetch a source image or a cached result by key,
/// write a result back, or evict one. `key` is whatever the caller resolved
/// (an `image` param, or a result-cache hash from `imagorpath::hasher`).
#[async_trait]
pub trait ImageStorage {
    async fn get(&self, key: &str) -> Result<Blob>;
    async fn put(&self, key: &str, blob: &Blob) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}
