//! Blob broker failure modes.
//!
//! The broker only ever fails two ways as far as its callers are concerned:
//! the object (or multipart session) wasn't there, or the backend couldn't be
//! reached. `Invalid` covers a completion call whose part list the backend
//! itself rejected, which callers fold into a `BadRequest`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("multipart session not found: {upload_id}")]
    UploadNotFound { upload_id: String },

    #[error("invalid completion request: {message}")]
    Invalid { message: String },

    #[error("blob backend unavailable: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type BlobResult<T> = Result<T, BlobError>;

impl BlobError {
    pub fn backend(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend {
            source: Box::new(source),
        }
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn upload_not_found(upload_id: impl Into<String>) -> Self {
        Self::UploadNotFound {
            upload_id: upload_id.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}
