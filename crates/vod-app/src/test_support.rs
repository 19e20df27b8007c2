//! Test doubles shared by the use-case tests.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use vod_models::ResourceId;
use vod_storage::{AssetStore, StorageError};

/// [`AssetStore`] that records every call and can inject write failures.
#[derive(Default)]
pub struct RecordingStore {
    saved: Mutex<Vec<(String, String, Vec<u8>)>>,
    deleted: Mutex<Vec<String>>,
    fail_after: Mutex<Option<usize>>,
}

impl RecordingStore {
    /// Fail every save once `n` saves have succeeded.
    pub fn fail_saves_after(&self, n: usize) {
        *self.fail_after.lock().unwrap() = Some(n);
    }

    /// Successful saves as `(resource_id, asset_path)` pairs.
    pub fn saved(&self) -> Vec<(String, String)> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .map(|(r, p, _)| (r.clone(), p.clone()))
            .collect()
    }

    /// Bytes written for a given asset path, if any.
    pub fn saved_bytes(&self, asset_path: &str) -> Option<Vec<u8>> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .find(|(_, p, _)| p == asset_path)
            .map(|(_, _, bytes)| bytes.clone())
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn delete_count(&self) -> usize {
        self.deleted.lock().unwrap().len()
    }
}

#[async_trait]
impl AssetStore for RecordingStore {
    async fn save(
        &self,
        resource_id: &ResourceId,
        asset_path: &str,
        content: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<(), StorageError> {
        let should_fail = {
            let fail_after = self.fail_after.lock().unwrap();
            matches!(*fail_after, Some(n) if self.saved.lock().unwrap().len() >= n)
        };
        if should_fail {
            return Err(StorageError::WriteAsset {
                path: asset_path.into(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "injected save failure"),
            });
        }

        let mut bytes = Vec::new();
        content
            .read_to_end(&mut bytes)
            .await
            .map_err(|source| StorageError::WriteAsset {
                path: asset_path.into(),
                source,
            })?;

        self.saved.lock().unwrap().push((
            resource_id.as_str().to_string(),
            asset_path.to_string(),
            bytes,
        ));
        Ok(())
    }

    async fn delete_all(&self, resource_id: &ResourceId) -> Result<(), StorageError> {
        self.deleted
            .lock()
            .unwrap()
            .push(resource_id.as_str().to_string());
        Ok(())
    }
}
