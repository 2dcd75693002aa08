use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetaError {
    #[error("metadata backend unavailable: {source}")]
    Backend {
        #[source]
        source: redis::RedisError,
    },
}

pub type MetaResult<T> = Result<T, MetaError>;

impl From<redis::RedisError> for MetaError {
    fn from(source: redis::RedisError) -> Self {
        Self::Backend { source }
    }
}
