pub mod local;
pub mod s3;

use anyhow::Result;
use async_trait::async_trait;

/// Largest page a single LIST may return.
pub const MAX_LIST_PAGE: usize = 1000;
/// Largest key set a single batched DELETE may carry.
pub const MAX_DELETE_BATCH: usize = 1000;

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Opaque cursor for the next page; `None` once the listing is drained.
    pub continuation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFailure {
    pub key: String,
    pub reason: String,
}

/// Per-key outcome of a batched delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    pub failed: Vec<KeyFailure>,
}

/// Flat, externally owned key space addressed by bucket name.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write or overwrite the object at `key`.
    async fn put(&self, bucket: &str, key: &str, data: &[u8], content_type: &str) -> Result<()>;

    /// Read the whole object, or `None` when nothing is stored at `key`.
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// List at most `max_keys` keys starting with `prefix`, in key order.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage>;

    /// Delete every key in `keys`, reporting each outcome. Absent keys count
    /// as deleted. An `Err` means the batch as a whole could not be issued.
    async fn delete_batch(&self, bucket: &str, keys: &[String]) -> Result<DeleteReport>;
}
