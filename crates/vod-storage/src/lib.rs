//! Durable asset storage.
//!
//! Assets live in a two-level tree: one directory per resource ID, files
//! (original upload, manifest, segments) below it. The store is not
//! transactional; callers compensate for partial writes with
//! [`AssetStore::delete_all`].

pub mod error;
pub mod local;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use vod_models::ResourceId;

pub use error::StorageError;
pub use local::LocalAssetStore;

/// Content-addressed file tree keyed by resource ID.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Stream `content` into `{base}/{resource_id}/{asset_path}`, creating
    /// intermediate directories as needed. A failed write may leave partial
    /// bytes behind.
    async fn save(
        &self,
        resource_id: &ResourceId,
        asset_path: &str,
        content: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<(), StorageError>;

    /// Remove the entire subtree for `resource_id`. A missing subtree is a
    /// success.
    async fn delete_all(&self, resource_id: &ResourceId) -> Result<(), StorageError>;
}
