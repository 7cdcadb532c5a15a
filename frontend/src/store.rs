//! Data access for campaign assets.
//!
//! The transport (GraphQL today) lives behind [`AssetStore`]. Every call is
//! asynchronous and may fail; the editor turns failures into notices.

use futures::future::BoxFuture;
use shared::{AssetId, AssetInput, AssetRecord, AssetVersion, VersionId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("asset {0} not found")]
    NotFound(AssetId),
    #[error("request rejected: {0}")]
    Rejected(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait AssetStore: Send + Sync + 'static {
    /// `Ok(None)` when the asset does not exist (anymore).
    fn fetch_asset(&self, asset_id: &AssetId) -> BoxFuture<'static, StoreResult<Option<AssetRecord>>>;

    fn create_asset(&self, input: AssetInput) -> BoxFuture<'static, StoreResult<AssetRecord>>;

    fn update_asset(&self, asset_id: &AssetId, input: AssetInput) -> BoxFuture<'static, StoreResult<AssetRecord>>;

    fn delete_asset(&self, asset_id: &AssetId) -> BoxFuture<'static, StoreResult<()>>;

    fn revert_asset(&self, asset_id: &AssetId, version_id: &VersionId) -> BoxFuture<'static, StoreResult<AssetRecord>>;

    /// Newest first.
    fn list_versions(&self, asset_id: &AssetId) -> BoxFuture<'static, StoreResult<Vec<AssetVersion>>>;
}
