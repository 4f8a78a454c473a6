use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::{BucketConfig, BucketRole};
use crate::error::StorageError;
use crate::key;
use crate::payload::Payload;
use crate::store::{KeyFailure, ListPage, MAX_DELETE_BATCH, MAX_LIST_PAGE, ObjectStore};

const PLACEHOLDER_CONTENT_TYPE: &str = "application/x-directory";

/// Outcome of draining one prefix in one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub bucket: String,
    pub prefix: String,
    pub deleted: usize,
    pub pages: usize,
    pub failed: Vec<KeyFailure>,
}

impl DeleteSummary {
    /// True when no key reported a per-key failure.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Directory-style lifecycle of a record's objects: one prefix per patient or
/// visit, holding a placeholder, uploaded recordings and derived reports.
///
/// The manager keeps no state besides the injected store and bucket names.
/// The store is the only source of truth and may be shared by any number of
/// concurrent callers.
pub struct StorageLifecycleManager {
    store: Arc<dyn ObjectStore>,
    buckets: BucketConfig,
    page_size: usize,
}

impl StorageLifecycleManager {
    pub fn new(store: Arc<dyn ObjectStore>, buckets: BucketConfig) -> Self {
        Self {
            store,
            buckets,
            page_size: MAX_LIST_PAGE,
        }
    }

    /// Cap listing pages below the store maximum.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_LIST_PAGE);
        self
    }

    pub fn buckets(&self) -> &BucketConfig {
        &self.buckets
    }

    pub fn bucket(&self, role: BucketRole) -> Result<&str, StorageError> {
        self.buckets.resolve(role)
    }

    /// Make `logical_key` exist as a prefix in every mirrored bucket.
    ///
    /// Writes a zero-byte placeholder at the normalized prefix; repeating the
    /// call overwrites it. All mirrored buckets are resolved before the first
    /// write, so a missing bucket name never leaves a half-created record.
    pub async fn create_prefix(&self, logical_key: &str) -> Result<String, StorageError> {
        let result = self.create_prefix_inner(logical_key).await;
        if let Err(e) = &result {
            warn!(key = %logical_key, error = %e, "create_prefix failed");
        }
        result
    }

    async fn create_prefix_inner(&self, logical_key: &str) -> Result<String, StorageError> {
        let prefix = key::normalize_prefix(logical_key)?;
        let buckets = self.buckets.mirrored()?;

        let writes = buckets.iter().map(|bucket| {
            let prefix = &prefix;
            async move {
                self.store
                    .put(bucket, prefix, &[], PLACEHOLDER_CONTENT_TYPE)
                    .await
                    .map_err(StorageError::transport("create_prefix", bucket, prefix))
            }
        });
        futures::future::try_join_all(writes).await?;

        info!(prefix = %prefix, buckets = ?buckets, "Prefix created");
        Ok(prefix)
    }

    /// Create the prefix for a new visit of the patient with `email`.
    pub async fn create_visit_prefix(&self, email: &str) -> Result<String, StorageError> {
        if email.trim().is_empty() {
            return Err(StorageError::InvalidInput("email is required".to_string()));
        }
        self.create_prefix(&key::visit_token(email)).await
    }

    /// Store `payload` under `prefix` in the input bucket and return its key.
    ///
    /// The key is `<prefix><micros>-<file name>`. No existence check is made;
    /// uniqueness rests on the timestamp.
    pub async fn put_object(
        &self,
        prefix: &str,
        payload: &Payload,
    ) -> Result<String, StorageError> {
        let result = self.put_object_inner(prefix, payload).await;
        if let Err(e) = &result {
            warn!(
                prefix = %prefix,
                file = %payload.file_name,
                error = %e,
                "put_object failed"
            );
        }
        result
    }

    async fn put_object_inner(
        &self,
        prefix: &str,
        payload: &Payload,
    ) -> Result<String, StorageError> {
        let bucket = self.bucket(BucketRole::Input)?;
        let prefix = key::normalize_prefix(prefix)?;
        let object_key = key::upload_key(&prefix, chrono::Utc::now(), &payload.file_name)?;
        let data = payload.read().await?;

        self.store
            .put(bucket, &object_key, &data, &payload.content_type)
            .await
            .map_err(StorageError::transport("put_object", bucket, &object_key))?;

        info!(
            bucket = %bucket,
            key = %object_key,
            size_bytes = data.len(),
            content_type = %payload.content_type,
            "Object uploaded"
        );
        Ok(object_key)
    }

    /// Every key under `prefix`, fetched page by page as the stream is polled.
    ///
    /// A non-empty `prefix` is normalized; an empty one lists the whole
    /// bucket. Each call starts a fresh listing.
    pub fn list_under_prefix<'a>(
        &'a self,
        bucket: &'a str,
        prefix: &str,
    ) -> BoxStream<'a, Result<String, StorageError>> {
        let prefix = match list_prefix(bucket, prefix) {
            Ok(prefix) => prefix,
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };

        // `None` once the store reports no continuation.
        let pages = stream::try_unfold(Some(None::<String>), move |cursor| {
            let prefix = prefix.clone();
            async move {
                let Some(token) = cursor else {
                    return Ok(None);
                };
                let page = self.list_page(bucket, &prefix, token.as_deref()).await?;
                let next = page.continuation.map(Some);
                Ok::<_, StorageError>(Some((page.keys, next)))
            }
        });

        pages
            .map_ok(|keys| stream::iter(keys.into_iter().map(Ok::<String, StorageError>)))
            .try_flatten()
            .boxed()
    }

    /// Drain [`list_under_prefix`](Self::list_under_prefix) into a vector.
    pub async fn collect_keys(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<String>, StorageError> {
        self.list_under_prefix(bucket, prefix)
            .try_collect()
            .await
            .inspect_err(|e| {
                warn!(bucket = %bucket, prefix = %prefix, error = %e, "listing failed")
            })
    }

    /// Delete every object under `prefix` in `bucket`, one listing page at a
    /// time.
    ///
    /// Best effort, no rollback: if a page fails, pages already processed
    /// stay deleted and later pages are untouched. An object written into the
    /// prefix after its page was listed can survive; the store offers no
    /// transactional prefix semantics and none are added here. Keys that the
    /// store refused individually are returned in
    /// [`DeleteSummary::failed`] rather than as an error.
    pub async fn delete_under_prefix(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<DeleteSummary, StorageError> {
        let prefix = match key::normalize_prefix(prefix) {
            Ok(prefix) => prefix,
            Err(e) => {
                warn!(bucket = %bucket, error = %e, "delete_under_prefix rejected");
                return Err(e);
            }
        };
        let mut summary = DeleteSummary {
            bucket: bucket.to_string(),
            prefix: prefix.clone(),
            ..Default::default()
        };
        let result = self.drain_prefix(&mut summary).await;
        match &result {
            Ok(()) if summary.is_complete() => info!(
                bucket = %bucket,
                prefix = %prefix,
                deleted = summary.deleted,
                pages = summary.pages,
                "Prefix deleted"
            ),
            Ok(()) => warn!(
                bucket = %bucket,
                prefix = %prefix,
                deleted = summary.deleted,
                failed = summary.failed.len(),
                "Prefix deleted with per-key failures"
            ),
            Err(e) => warn!(
                bucket = %bucket,
                prefix = %prefix,
                deleted = summary.deleted,
                error = %e,
                "delete_under_prefix aborted"
            ),
        }
        result.map(|()| summary)
    }

    async fn drain_prefix(&self, summary: &mut DeleteSummary) -> Result<(), StorageError> {
        let bucket = summary.bucket.clone();
        let prefix = summary.prefix.clone();
        if bucket.trim().is_empty() {
            return Err(StorageError::InvalidInput("bucket name is required".to_string()));
        }

        let mut cursor: Option<String> = None;
        loop {
            let page = self.list_page(&bucket, &prefix, cursor.as_deref()).await?;
            if page.keys.is_empty() && page.continuation.is_none() {
                break;
            }

            if !page.keys.is_empty() {
                for batch in page.keys.chunks(MAX_DELETE_BATCH) {
                    let report = self
                        .store
                        .delete_batch(&bucket, batch)
                        .await
                        .map_err(StorageError::transport("delete_batch", &bucket, &prefix))?;
                    summary.deleted += report.deleted.len();
                    summary.failed.extend(report.failed);
                }
                summary.pages += 1;
                debug!(
                    bucket = %bucket,
                    prefix = %prefix,
                    page = summary.pages,
                    deleted = summary.deleted,
                    "Page deleted"
                );
            }

            match page.continuation {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(())
    }

    /// Remove a record's prefix from both the input and the output bucket.
    ///
    /// Both buckets are drained concurrently and each runs to completion even
    /// if the other fails; the first error is returned after both finish.
    pub async fn delete_record(
        &self,
        logical_key: &str,
    ) -> Result<Vec<DeleteSummary>, StorageError> {
        let input = self.bucket(BucketRole::Input)?;
        let output = self.bucket(BucketRole::Output)?;
        let mut buckets = vec![input];
        if output != input {
            buckets.push(output);
        }

        let drains = buckets
            .iter()
            .map(|bucket| self.delete_under_prefix(bucket, logical_key));
        futures::future::join_all(drains)
            .await
            .into_iter()
            .collect()
    }

    /// Fetch `key` and parse it as JSON.
    pub async fn get_json_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<serde_json::Value, StorageError> {
        self.get_json(bucket, key).await
    }

    /// Fetch `key` and deserialize it into `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<T, StorageError> {
        let result = self.get_json_inner(bucket, key).await;
        if let Err(e) = &result {
            warn!(bucket = %bucket, key = %key, error = %e, "get_json_object failed");
        }
        result
    }

    async fn get_json_inner<T: DeserializeOwned>(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<T, StorageError> {
        if bucket.trim().is_empty() {
            return Err(StorageError::InvalidInput("bucket name is required".to_string()));
        }
        let data = self
            .store
            .get(bucket, key)
            .await
            .map_err(StorageError::transport("get_object", bucket, key))?
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
        serde_json::from_slice(&data).map_err(|source| StorageError::Parse {
            bucket: bucket.to_string(),
            key: key.to_string(),
            source,
        })
    }

    /// The `summary.json` report of a visit, from the output bucket.
    pub async fn get_report(&self, visit_prefix: &str) -> Result<serde_json::Value, StorageError> {
        let bucket = self.bucket(BucketRole::Output)?;
        let report_key = key::report_key(visit_prefix)?;
        self.get_json_object(bucket, &report_key).await
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        cursor: Option<&str>,
    ) -> Result<ListPage, StorageError> {
        self.store
            .list_page(bucket, prefix, cursor, self.page_size)
            .await
            .map_err(StorageError::transport("list", bucket, prefix))
    }
}

fn list_prefix(bucket: &str, prefix: &str) -> Result<String, StorageError> {
    if bucket.trim().is_empty() {
        return Err(StorageError::InvalidInput("bucket name is required".to_string()));
    }
    if prefix.trim().is_empty() {
        Ok(String::new())
    } else {
        key::normalize_prefix(prefix)
    }
}
