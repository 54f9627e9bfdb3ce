//! Storage port.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::client::{R2Client, R2Config};
use crate::error::StorageResult;
use crate::kind::ObjectKind;
use crate::local::LocalObjectStore;

/// Object storage as used by the pipeline.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file and return its public URL.
    async fn upload_file(
        &self,
        path: &Path,
        kind: ObjectKind,
        id: &str,
        name: Option<&str>,
    ) -> StorageResult<String>;

    /// Download the object at `key` to `path`, creating parent directories.
    async fn download_file(&self, key: &str, path: &Path) -> StorageResult<()>;

    /// Whether a complete object is stored at `key`.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Public URL for a key.
    fn public_url(&self, key: &str) -> String;

    /// Cheap reachability check for readiness probes.
    async fn check_connectivity(&self) -> StorageResult<()>;
}

/// Pick a backend from the environment: R2 when `R2_ENDPOINT_URL` is set,
/// otherwise a local directory (`LOCAL_STORAGE_DIR`, served at `LOCAL_STORAGE_URL`).
pub async fn object_store_from_env() -> StorageResult<Arc<dyn ObjectStore>> {
    if R2Config::is_configured() {
        let client = R2Client::from_env().await?;
        info!("Using R2 object storage");
        return Ok(Arc::new(client));
    }

    let root = std::env::var("LOCAL_STORAGE_DIR").unwrap_or_else(|_| "/tmp/subburn/storage".to_string());
    let store = match std::env::var("LOCAL_STORAGE_URL") {
        Ok(base_url) if !base_url.is_empty() => LocalObjectStore::new(&root, base_url),
        _ => LocalObjectStore::with_file_urls(&root),
    };
    warn!("R2 not configured, storing objects under {}", root);
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn test_from_env_falls_back_to_local() {
        let dir = tempfile::tempdir().unwrap();
        std::env::remove_var("R2_ENDPOINT_URL");
        std::env::set_var("LOCAL_STORAGE_DIR", dir.path());
        std::env::set_var("LOCAL_STORAGE_URL", "http://localhost:8080/media");

        let store = object_store_from_env().await.unwrap();
        assert_eq!(
            store.public_url("captioned/o/v.mp4"),
            "http://localhost:8080/media/captioned/o/v.mp4"
        );

        std::env::remove_var("LOCAL_STORAGE_DIR");
        std::env::remove_var("LOCAL_STORAGE_URL");
    }
}
