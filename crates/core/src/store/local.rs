use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{DeleteReport, KeyFailure, ListPage, ObjectStore};

/// Object store backed by a local directory.
///
/// Each bucket is a subdirectory; each object is one file named by the hex
/// encoding of its key. Hex keeps byte order, so sorted file names give the
/// same listing order as an S3 LIST. Content types are not persisted.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        Ok(Self { root })
    }

    pub fn init(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create directory: {}", root.display()))?;
        Ok(Self { root })
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf> {
        if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket.starts_with('.') {
            anyhow::bail!("invalid bucket name: {bucket:?}");
        }
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        Ok(self.bucket_dir(bucket)?.join(hex::encode(key)))
    }
}

fn decode_name(name: &str) -> Option<String> {
    hex::decode(name)
        .ok()
        .and_then(|raw| String::from_utf8(raw).ok())
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        _content_type: &str,
    ) -> Result<()> {
        let full = self.object_path(bucket, key)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, data)
            .await
            .with_context(|| format!("failed to write: {}", full.display()))
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let full = self.object_path(bucket, key)?;
        match tokio::fs::read(&full).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read: {}", full.display())),
        }
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage> {
        let dir = self.bucket_dir(bucket)?;
        if !dir.is_dir() {
            return Ok(ListPage::default());
        }
        let start_after = match continuation {
            Some(token) => Some(
                decode_name(token)
                    .with_context(|| format!("invalid continuation token: {token}"))?,
            ),
            None => None,
        };

        let mut keys = Vec::new();
        let mut read_dir = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("failed to list: {}", dir.display()))?;
        while let Some(entry) = read_dir.next_entry().await? {
            let Some(key) = entry.file_name().to_str().and_then(decode_name) else {
                continue;
            };
            let after_cursor = start_after.as_deref().is_none_or(|cursor| key.as_str() > cursor);
            if key.starts_with(prefix) && after_cursor {
                keys.push(key);
            }
        }
        keys.sort();

        let continuation = if keys.len() > max_keys {
            keys.truncate(max_keys);
            keys.last().map(hex::encode)
        } else {
            None
        };
        Ok(ListPage { keys, continuation })
    }

    async fn delete_batch(&self, bucket: &str, keys: &[String]) -> Result<DeleteReport> {
        let mut report = DeleteReport::default();
        for key in keys {
            let full = self.object_path(bucket, key)?;
            match tokio::fs::remove_file(&full).await {
                Ok(()) => report.deleted.push(key.clone()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    report.deleted.push(key.clone())
                }
                Err(e) => report.failed.push(KeyFailure {
                    key: key.clone(),
                    reason: e.to_string(),
                }),
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::init(dir.path()).unwrap();

        store
            .put("rec", "doc@example.com/", b"", "application/x-directory")
            .await
            .unwrap();
        store
            .put("rec", "doc@example.com/1-rec.wav", b"RIFF", "audio/wav")
            .await
            .unwrap();

        let data = store.get("rec", "doc@example.com/1-rec.wav").await.unwrap();
        assert_eq!(data.as_deref(), Some(&b"RIFF"[..]));
        assert_eq!(
            store.get("rec", "doc@example.com/").await.unwrap(),
            Some(Vec::new())
        );

        let page = store
            .list_page("rec", "doc@example.com/", None, 10)
            .await
            .unwrap();
        assert_eq!(
            page.keys,
            vec!["doc@example.com/", "doc@example.com/1-rec.wav"]
        );
        assert_eq!(page.continuation, None);

        let report = store.delete_batch("rec", &page.keys).await.unwrap();
        assert_eq!(report.deleted.len(), 2);
        assert!(report.failed.is_empty());
        assert_eq!(store.get("rec", "doc@example.com/1-rec.wav").await.unwrap(), None);
    }

    #[tokio::test]
    async fn listing_pages_in_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::init(dir.path()).unwrap();
        for i in 0..5 {
            store.put("rec", &format!("p/{i}"), b"", "").await.unwrap();
        }
        store.put("rec", "pq/other", b"", "").await.unwrap();

        let first = store.list_page("rec", "p/", None, 2).await.unwrap();
        assert_eq!(first.keys, vec!["p/0", "p/1"]);
        let token = first.continuation.unwrap();

        let second = store.list_page("rec", "p/", Some(&token), 2).await.unwrap();
        assert_eq!(second.keys, vec!["p/2", "p/3"]);

        let third = store
            .list_page("rec", "p/", second.continuation.as_deref(), 2)
            .await
            .unwrap();
        assert_eq!(third.keys, vec!["p/4"]);
        assert_eq!(third.continuation, None);
    }

    #[tokio::test]
    async fn missing_bucket_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::init(dir.path()).unwrap();
        let page = store.list_page("absent", "x/", None, 10).await.unwrap();
        assert!(page.keys.is_empty());
        assert_eq!(store.get("absent", "x/y").await.unwrap(), None);
    }

    #[tokio::test]
    async fn deleting_absent_key_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::init(dir.path()).unwrap();
        let report = store
            .delete_batch("rec", &["never/written".to_string()])
            .await
            .unwrap();
        assert_eq!(report.deleted, vec!["never/written"]);
    }

    #[tokio::test]
    async fn rejects_path_like_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::init(dir.path()).unwrap();
        assert!(store.put("../escape", "k", b"", "").await.is_err());
    }
}
