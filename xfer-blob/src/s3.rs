//! S3-compatible implementation of [`BlobBroker`].

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{Builder as S3ConfigBuilder, Region};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use crate::broker::BlobBroker;
use crate::error::{BlobError, BlobResult};
use crate::types::{ByteStream, CompletedPart, ObjectHead};

pub struct S3CompatibleStore {
    client: Client,
    bucket: String,
}

impl S3CompatibleStore {
    /// Builds a client from the ambient environment (`aws-config`'s default
    /// provider chain), optionally overridden with an explicit region, a
    /// custom endpoint, and path-style addressing for S3-compatible backends
    /// that aren't AWS itself.
    pub async fn from_env(
        bucket: String,
        region: Option<&str>,
        endpoint: Option<&str>,
        path_style: bool,
    ) -> Self {
        let shared_config = aws_config::load_from_env().await;
        let mut builder = S3ConfigBuilder::from(&shared_config).force_path_style(path_style);
        if let Some(region) = region {
            builder = builder.region(Region::new(region.to_string()));
        }
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        let client = Client::from_conf(builder.build());
        Self { client, bucket }
    }

    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

fn presign_config(ttl: Duration) -> BlobResult<PresigningConfig> {
    PresigningConfig::expires_in(ttl).map_err(|e| BlobError::backend(e))
}

#[async_trait]
impl BlobBroker for S3CompatibleStore {
    async fn sign_put(&self, key: &str, ttl: Duration) -> BlobResult<String> {
        debug!(key, ?ttl, "signing put url");
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config(ttl)?)
            .await
            .map_err(|e| BlobError::backend(e))?;
        Ok(presigned.uri().to_string())
    }

    async fn sign_get(
        &self,
        key: &str,
        ttl: Duration,
        download_filename: Option<&str>,
    ) -> BlobResult<String> {
        debug!(key, ?ttl, "signing get url");
        let mut req = self.client.get_object().bucket(&self.bucket).key(key);
        if let Some(filename) = download_filename {
            req = req.response_content_disposition(format!(
                "attachment; filename=\"{}\"",
                filename.replace('"', "")
            ));
        }
        let presigned = req
            .presigned(presign_config(ttl)?)
            .await
            .map_err(|e| BlobError::backend(e))?;
        Ok(presigned.uri().to_string())
    }

    async fn start_multipart(&self, key: &str) -> BlobResult<String> {
        debug!(key, "starting multipart upload");
        let out = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| BlobError::backend(e))?;
        out.upload_id()
            .map(|s| s.to_string())
            .ok_or_else(|| BlobError::invalid("backend returned no upload id"))
    }

    async fn sign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        ttl: Duration,
    ) -> BlobResult<String> {
        debug!(key, upload_id, part_number, ?ttl, "signing part url");
        let presigned = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .presigned(presign_config(ttl)?)
            .await
            .map_err(|e| BlobError::backend(e))?;
        Ok(presigned.uri().to_string())
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> BlobResult<()> {
        if parts.is_empty() {
            return Err(BlobError::invalid("no parts supplied"));
        }
        debug!(key, upload_id, parts = parts.len(), "completing multipart upload");
        let completed_parts: Vec<S3CompletedPart> = parts
            .into_iter()
            .map(|p| {
                S3CompletedPart::builder()
                    .part_number(p.part_number)
                    .e_tag(p.etag)
                    .build()
            })
            .collect();

        let result = self
            .client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build(),
            )
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(e)) => {
                let msg = e.err().to_string();
                if msg.contains("NoSuchUpload") {
                    Err(BlobError::upload_not_found(upload_id))
                } else if msg.contains("InvalidPart") || msg.contains("EntityTooSmall") {
                    Err(BlobError::invalid(msg))
                } else {
                    Err(BlobError::backend(e.into_err()))
                }
            }
            Err(e) => Err(BlobError::backend(e)),
        }
    }

    async fn abort_multipart(&self, key: &str, upload_id: &str) -> BlobResult<()> {
        debug!(key, upload_id, "aborting multipart upload");
        let result = self
            .client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(e)) if e.err().to_string().contains("NoSuchUpload") => {
                Ok(())
            }
            Err(e) => Err(BlobError::backend(e)),
        }
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        debug!(key, "deleting object");
        let result = self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        // S3 delete is already idempotent (a missing key is not an error from
        // the API's point of view), so we just propagate backend failures.
        result.map(|_| ()).map_err(|e| BlobError::backend(e))
    }

    async fn stream_get(&self, key: &str) -> BlobResult<ByteStream> {
        debug!(key, "streaming object");
        let out = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if format!("{e:?}").contains("NoSuchKey") {
                    BlobError::not_found(key)
                } else {
                    BlobError::backend(e)
                }
            })?;

        let stream = tokio_util_compat_stream(out.body.into_async_read());
        Ok(Box::pin(stream))
    }

    async fn size(&self, key: &str) -> BlobResult<ObjectHead> {
        debug!(key, "fetching object size");
        let out = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if matches!(&e, SdkError::ServiceError(se) if se.err().is_not_found()) {
                    BlobError::not_found(key)
                } else {
                    BlobError::backend(e)
                }
            })?;
        Ok(ObjectHead {
            size_bytes: out.content_length().unwrap_or(0).max(0) as u64,
        })
    }

    async fn ping(&self) -> BlobResult<()> {
        debug!(bucket = %self.bucket, "pinging blob backend");
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| BlobError::backend(e))
    }
}

/// Adapts an `AsyncRead` object body into the boxed `Bytes` stream the broker
/// trait returns, so callers never depend on the AWS SDK's body type directly.
fn tokio_util_compat_stream<R>(reader: R) -> impl futures_core::Stream<Item = Result<Bytes, std::io::Error>>
where
    R: tokio::io::AsyncRead + Send + 'static,
{
    tokio_util::io::ReaderStream::new(reader)
}
