use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::delete_objects::DeleteObjectsOutput;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use tracing::{debug, info};

use super::{DeleteReport, KeyFailure, ListPage, MAX_DELETE_BATCH, ObjectStore};

/// Object store speaking the S3 REST protocol through `aws-sdk-s3`.
///
/// Holds one client for the life of the process; every bucket and every
/// concurrent caller shares its connection pool.
pub struct S3Store {
    client: Client,
    path_style: bool,
}

impl S3Store {
    /// Build a client for AWS (`endpoint = None`) or any S3-compatible
    /// endpoint. Without an access key pair, credentials come from the
    /// default AWS provider chain.
    pub async fn new(
        region: &str,
        endpoint: Option<&str>,
        access_key: Option<&str>,
        secret_key: Option<&str>,
        session_token: Option<&str>,
    ) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()));

        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        if let (Some(ak), Some(sk)) = (access_key, secret_key) {
            let creds = aws_sdk_s3::config::Credentials::new(
                ak,
                sk,
                session_token.map(str::to_string),
                None,
                "medisync-config",
            );
            loader = loader.credentials_provider(creds);
        }

        let sdk_config = loader.load().await;
        let path_style = endpoint.is_some();
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(path_style)
            .build();

        info!(region = %region, endpoint = ?endpoint, "S3 store initialized");

        Ok(Self {
            client: Client::from_conf(s3_config),
            path_style,
        })
    }
}

fn sdk_error(operation: &str, target: &str, err: impl std::error::Error) -> anyhow::Error {
    anyhow::anyhow!("S3 {operation} failed for {target}: {}", DisplayErrorContext(err))
}

fn delete_request(keys: &[String]) -> Result<Delete> {
    let objects = keys
        .iter()
        .map(|key| ObjectIdentifier::builder().key(key).build())
        .collect::<Result<Vec<_>, _>>()
        .context("invalid object key in delete batch")?;
    Delete::builder()
        .set_objects(Some(objects))
        .quiet(false)
        .build()
        .context("failed to build delete request")
}

/// Per-key outcome of a verbose DeleteObjects response.
fn delete_report(output: &DeleteObjectsOutput) -> DeleteReport {
    let deleted = output
        .deleted()
        .iter()
        .filter_map(|obj| obj.key().map(str::to_string))
        .collect();
    let failed = output
        .errors()
        .iter()
        .map(|err| KeyFailure {
            key: err.key().unwrap_or_default().to_string(),
            reason: format!(
                "{}: {}",
                err.code().unwrap_or("Unknown"),
                err.message().unwrap_or("no message")
            ),
        })
        .collect();
    DeleteReport { deleted, failed }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| sdk_error("PUT", &format!("{bucket}/{key}"), e))?;
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let response = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(response) => response,
            Err(e) if e.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                return Ok(None);
            }
            Err(e) => return Err(sdk_error("GET", &format!("{bucket}/{key}"), e)),
        };
        let body = response
            .body
            .collect()
            .await
            .with_context(|| format!("failed to read S3 body: {bucket}/{key}"))?;
        Ok(Some(body.into_bytes().to_vec()))
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .max_keys(i32::try_from(max_keys).unwrap_or(i32::MAX))
            .set_continuation_token(continuation.map(str::to_string))
            .send()
            .await
            .map_err(|e| sdk_error("LIST", &format!("{bucket}/{prefix}"), e))?;

        let keys = response
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(str::to_string))
            .collect();
        let continuation = if response.is_truncated() == Some(true) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };
        Ok(ListPage { keys, continuation })
    }

    async fn delete_batch(&self, bucket: &str, keys: &[String]) -> Result<DeleteReport> {
        if keys.is_empty() {
            return Ok(DeleteReport::default());
        }
        anyhow::ensure!(
            keys.len() <= MAX_DELETE_BATCH,
            "delete batch of {} keys exceeds {MAX_DELETE_BATCH}",
            keys.len()
        );

        let output = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete_request(keys)?)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteObjects", bucket, e))?;

        let report = delete_report(&output);
        debug!(
            bucket = %bucket,
            requested = keys.len(),
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "S3 batch delete finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_s3::types::{DeletedObject, Error as S3KeyError};

    use super::*;

    #[tokio::test]
    async fn custom_endpoint_switches_to_path_style() {
        let store = S3Store::new(
            "auto",
            Some("http://localhost:9000"),
            Some("minio"),
            Some("minio123"),
            None,
        )
        .await
        .unwrap();
        assert!(store.path_style);
        assert_eq!(
            store.client.config().region().map(|r| r.to_string()),
            Some("auto".to_string())
        );
    }

    #[tokio::test]
    async fn aws_region_uses_virtual_host_addressing() {
        let store = S3Store::new("eu-west-1", None, Some("AKIA"), Some("secret"), None)
            .await
            .unwrap();
        assert!(!store.path_style);
    }

    #[test]
    fn delete_request_is_verbose_and_keeps_every_key() {
        let keys = vec!["a/1".to_string(), "a/2".to_string()];
        let delete = delete_request(&keys).unwrap();
        assert_eq!(delete.quiet(), Some(false));
        let requested: Vec<&str> = delete.objects().iter().map(|o| o.key()).collect();
        assert_eq!(requested, vec!["a/1", "a/2"]);
    }

    #[test]
    fn verbose_response_maps_to_report() {
        let output = DeleteObjectsOutput::builder()
            .deleted(DeletedObject::builder().key("a/1").build())
            .errors(
                S3KeyError::builder()
                    .key("a/2")
                    .code("AccessDenied")
                    .message("Access Denied")
                    .build(),
            )
            .build();

        let report = delete_report(&output);
        assert_eq!(report.deleted, vec!["a/1".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].key, "a/2");
        assert!(report.failed[0].reason.contains("AccessDenied"));
    }
}
