//! Blob broker: pre-signed URL issuance and multipart-session lifecycle over
//! an S3-compatible object store.

pub mod broker;
pub mod error;
pub mod s3;
pub mod types;

pub use broker::BlobBroker;
pub use error::{BlobError, BlobResult};
pub use s3::S3CompatibleStore;
pub use types::{ByteStream, CompletedPart, ObjectHead};
