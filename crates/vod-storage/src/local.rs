//! Local-filesystem asset store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncRead;

use vod_models::ResourceId;

use crate::error::StorageError;
use crate::AssetStore;

/// [`AssetStore`] rooted at a base directory on the local filesystem.
pub struct LocalAssetStore {
    base_path: PathBuf,
}

impl LocalAssetStore {
    /// Create the store and ensure the base directory exists.
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

async fn create_dir_all(path: &Path) -> Result<(), StorageError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o755);

    builder.create(path).await.map_err(|source| StorageError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn save(
        &self,
        resource_id: &ResourceId,
        asset_path: &str,
        content: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<(), StorageError> {
        let full_path = self.base_path.join(resource_id.as_str()).join(asset_path);

        if let Some(dir) = full_path.parent() {
            create_dir_all(dir).await?;
        }

        let mut file = fs::File::create(&full_path)
            .await
            .map_err(|source| StorageError::WriteAsset {
                path: full_path.clone(),
                source,
            })?;

        tokio::io::copy(content, &mut file)
            .await
            .map_err(|source| StorageError::WriteAsset {
                path: full_path.clone(),
                source,
            })?;

        Ok(())
    }

    async fn delete_all(&self, resource_id: &ResourceId) -> Result<(), StorageError> {
        let resource_path = self.base_path.join(resource_id.as_str());

        match fs::remove_dir_all(&resource_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::DeleteResource {
                resource_id: resource_id.as_str().to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_writes_nested_paths_and_delete_all_removes_the_subtree() {
        let base = tempfile::tempdir().unwrap();
        let store = LocalAssetStore::new(base.path()).await.unwrap();
        let resource_id = ResourceId::from_string("res-1");

        let mut content: &[u8] = b"video bytes";
        store
            .save(&resource_id, "original.mp4", &mut content)
            .await
            .unwrap();

        let mut segment: &[u8] = b"segment bytes";
        store
            .save(&resource_id, "dash/seg1.m4s", &mut segment)
            .await
            .unwrap();

        let original = base.path().join("res-1/original.mp4");
        let nested = base.path().join("res-1/dash/seg1.m4s");
        assert_eq!(std::fs::read(&original).unwrap(), b"video bytes");
        assert_eq!(std::fs::read(&nested).unwrap(), b"segment bytes");

        store.delete_all(&resource_id).await.unwrap();
        assert!(!base.path().join("res-1").exists());
    }

    #[tokio::test]
    async fn delete_all_on_missing_subtree_is_a_success() {
        let base = tempfile::tempdir().unwrap();
        let store = LocalAssetStore::new(base.path()).await.unwrap();

        store
            .delete_all(&ResourceId::from_string("never-created"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn save_overwrites_an_existing_asset() {
        let base = tempfile::tempdir().unwrap();
        let store = LocalAssetStore::new(base.path()).await.unwrap();
        let resource_id = ResourceId::from_string("res-1");

        let mut first: &[u8] = b"first";
        store.save(&resource_id, "a.mp4", &mut first).await.unwrap();
        let mut second: &[u8] = b"second";
        store.save(&resource_id, "a.mp4", &mut second).await.unwrap();

        let stored = std::fs::read(base.path().join("res-1/a.mp4")).unwrap();
        assert_eq!(stored, b"second");
    }
}
