//! S3-compatible archive.
//!
//! Uploads carry `If-None-Match: *` so an existing object is never
//! replaced. Deletes look up the object's ETag first and send it as
//! `If-Match`, so an object rewritten after the listing is left alone.

use super::{with_timeout, RemoteArchive, RemoteObject, DEFAULT_TIMEOUT};
use crate::error::StorageError;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;

const PRECONDITION_FAILED: &str = "PreconditionFailed";
const CONDITIONAL_CONFLICT: &str = "ConditionalRequestConflict";

pub struct S3Archive {
    client: Client,
    bucket: String,
    timeout: Duration,
}

impl S3Archive {
    /// Builds a client from the environment credential chain. `endpoint`
    /// targets S3-compatible services and switches to path-style
    /// addressing.
    pub async fn new(bucket: String, endpoint: Option<String>, region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        if let Some(ref endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(endpoint.is_some())
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn backend_error<E, R>(action: &str, name: &str, err: &SdkError<E, R>) -> StorageError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    StorageError::Backend(format!("{action} {name}: {}", DisplayErrorContext(err)))
}

/// Whether an S3 error code means a conditional header did not hold.
fn is_conditional_failure(code: Option<&str>) -> bool {
    matches!(code, Some(PRECONDITION_FAILED) | Some(CONDITIONAL_CONFLICT))
}

/// The ETag a delete is conditioned on. Without one the object's identity
/// cannot be checked, so the delete is refused.
fn delete_condition<'a>(remote_name: &str, etag: Option<&'a str>) -> Result<&'a str, StorageError> {
    etag.ok_or_else(|| {
        tracing::warn!(object = %remote_name, "Object has no ETag, refusing unconditional delete");
        StorageError::PreconditionFailed(remote_name.to_string())
    })
}

pub(crate) fn to_chrono(t: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(t.secs(), t.subsec_nanos())
}

#[async_trait]
impl RemoteArchive for S3Archive {
    async fn upload(&self, local_path: &Path, remote_name: &str) -> Result<(), StorageError> {
        with_timeout("upload", self.timeout, async {
            let body = ByteStream::from_path(local_path).await.map_err(|e| {
                StorageError::Backend(format!("read {}: {}", local_path.display(), e))
            })?;

            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(remote_name)
                .if_none_match("*")
                .body(body)
                .send()
                .await
                .map_err(|e| {
                    if is_conditional_failure(e.code()) {
                        StorageError::AlreadyExists(remote_name.to_string())
                    } else {
                        backend_error("upload", remote_name, &e)
                    }
                })?;

            tracing::debug!(bucket = %self.bucket, object = %remote_name, "Uploaded object");
            Ok::<_, StorageError>(())
        })
        .await
    }

    async fn list(&self) -> Result<Vec<RemoteObject>, StorageError> {
        with_timeout("list", self.timeout, async {
            let mut results = Vec::new();
            let mut continuation_token: Option<String> = None;

            loop {
                let mut request = self.client.list_objects_v2().bucket(&self.bucket);
                if let Some(token) = continuation_token.take() {
                    request = request.continuation_token(token);
                }

                let response = request
                    .send()
                    .await
                    .map_err(|e| backend_error("list", &self.bucket, &e))?;

                for object in response.contents() {
                    let Some(name) = object.key() else { continue };
                    match object.last_modified().and_then(to_chrono) {
                        Some(last_modified) => results.push(RemoteObject {
                            name: name.to_string(),
                            last_modified,
                        }),
                        None => {
                            tracing::warn!(object = %name, "Listed object has no modification time, ignoring");
                        }
                    }
                }

                if response.is_truncated().unwrap_or(false) {
                    continuation_token = response.next_continuation_token().map(str::to_string);
                    if continuation_token.is_none() {
                        break;
                    }
                } else {
                    break;
                }
            }

            Ok::<_, StorageError>(results)
        })
        .await
    }

    async fn delete(&self, remote_name: &str) -> Result<(), StorageError> {
        with_timeout("delete", self.timeout, async {
            let head = self
                .client
                .head_object()
                .bucket(&self.bucket)
                .key(remote_name)
                .send()
                .await
                .map_err(|e| {
                    if e.as_service_error().map(|se| se.is_not_found()).unwrap_or(false) {
                        StorageError::NotFound(remote_name.to_string())
                    } else {
                        backend_error("stat", remote_name, &e)
                    }
                })?;

            let etag = delete_condition(remote_name, head.e_tag())?;

            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(remote_name)
                .if_match(etag)
                .send()
                .await
                .map_err(|e| {
                    if is_conditional_failure(e.code()) {
                        StorageError::PreconditionFailed(remote_name.to_string())
                    } else {
                        backend_error("delete", remote_name, &e)
                    }
                })?;

            tracing::debug!(bucket = %self.bucket, object = %remote_name, "Deleted object");
            Ok::<_, StorageError>(())
        })
        .await
    }
}
