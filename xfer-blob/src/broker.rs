//! The Blob Broker trait: a thin, capability-preserving wrapper over an
//! S3-compatible object store.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BlobResult;
use crate::types::{ByteStream, CompletedPart, ObjectHead};

#[async_trait]
pub trait BlobBroker: Send + Sync {
    /// URL with which the client may PUT one object at `key`, valid for `ttl`.
    async fn sign_put(&self, key: &str, ttl: Duration) -> BlobResult<String>;

    /// URL with which the client may GET `key`, valid for `ttl`. When
    /// `download_filename` is set the URL carries a `Content-Disposition`.
    async fn sign_get(
        &self,
        key: &str,
        ttl: Duration,
        download_filename: Option<&str>,
    ) -> BlobResult<String>;

    async fn start_multipart(&self, key: &str) -> BlobResult<String>;

    async fn sign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        ttl: Duration,
    ) -> BlobResult<String>;

    /// `parts` must already be sorted by ascending `part_number`.
    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> BlobResult<()>;

    /// Idempotent: a missing session is not an error.
    async fn abort_multipart(&self, key: &str, upload_id: &str) -> BlobResult<()>;

    /// Idempotent: a missing object is not an error.
    async fn delete(&self, key: &str) -> BlobResult<()>;

    async fn stream_get(&self, key: &str) -> BlobResult<ByteStream>;

    async fn size(&self, key: &str) -> BlobResult<ObjectHead>;

    async fn ping(&self) -> BlobResult<()>;
}
