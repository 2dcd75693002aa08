//! Wire types shared between the broker trait and its S3-backed implementation.

use std::pin::Pin;

use bytes::Bytes;
use futures_core::Stream;

/// A streamed object body. Boxed so callers don't need to know the concrete
/// stream type the backend produces.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// One completed part of a multipart upload, ready to hand to `complete_multipart`.
#[derive(Debug, Clone)]
pub struct CompletedPart {
    pub part_number: i32,
    pub etag: String,
}

/// Metadata about a stored object, returned by `size`.
#[derive(Debug, Clone, Copy)]
pub struct ObjectHead {
    pub size_bytes: u64,
}
