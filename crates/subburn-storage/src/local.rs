//! Filesystem-backed object store.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::client::join_url;
use crate::error::{StorageError, StorageResult};
use crate::kind::{object_key, ObjectKind};
use crate::store::ObjectStore;

/// Stores objects as files under a root directory.
///
/// Public URLs are built from `base_url`, which should point at whatever
/// serves `root` (or a `file://` URL for purely local runs).
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    /// Root at `root`, with `file://` URLs.
    pub fn with_file_urls(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let base_url = format!("file://{}", root.display());
        Self { root, base_url }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || key.split('/').any(|s| s.is_empty() || s == "." || s == "..") {
            return Err(StorageError::UnsafeKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload_file(
        &self,
        path: &Path,
        kind: ObjectKind,
        id: &str,
        name: Option<&str>,
    ) -> StorageResult<String> {
        let key = object_key(kind, id, name)?;
        let dest = self.resolve(&key)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Copy under a temporary name so readers never see a partial object
        let mut partial = dest.clone().into_os_string();
        partial.push(".partial");
        let partial = PathBuf::from(partial);
        tokio::fs::copy(path, &partial)
            .await
            .map_err(|e| StorageError::put_failed(format!("{}: {}", path.display(), e)))?;
        tokio::fs::rename(&partial, &dest)
            .await
            .map_err(|e| StorageError::put_failed(format!("{}: {}", dest.display(), e)))?;
        debug!("Stored {} at {}", path.display(), dest.display());
        Ok(self.public_url(&key))
    }

    async fn download_file(&self, key: &str, path: &Path) -> StorageResult<()> {
        let src = self.resolve(key)?;
        if !tokio::fs::try_exists(&src).await.unwrap_or(false) {
            return Err(StorageError::missing(key));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&src, path)
            .await
            .map_err(|e| StorageError::fetch_failed(e.to_string()))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.resolve(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    fn public_url(&self, key: &str) -> String {
        join_url(&self.base_url, key)
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }
}
