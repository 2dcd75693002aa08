//! The Metadata Store Adapter trait: a field-oriented map-of-maps with
//! per-top-key TTL and an atomic integer increment.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::MetaResult;

#[async_trait]
pub trait FieldStore: Send + Sync {
    async fn set_field(&self, id: &str, field: &str, value: &str) -> MetaResult<()>;

    async fn get_field(&self, id: &str, field: &str) -> MetaResult<Option<String>>;

    async fn get_all(&self, id: &str) -> MetaResult<HashMap<String, String>>;

    async fn del_field(&self, id: &str, fields: &[&str]) -> MetaResult<()>;

    /// Atomic: two concurrent callers never observe the same return value.
    async fn incr(&self, id: &str, field: &str, delta: i64) -> MetaResult<i64>;

    async fn expire(&self, id: &str, seconds: u64) -> MetaResult<()>;

    /// `None` if the key has no TTL or doesn't exist.
    async fn ttl(&self, id: &str) -> MetaResult<Option<i64>>;

    async fn exists(&self, id: &str) -> MetaResult<bool>;

    async fn del(&self, id: &str) -> MetaResult<()>;

    /// Convenience wrapper over repeated `set_field` calls. Not atomic across
    /// fields; callers that need write-ordering guarantees rely on the order
    /// they issue these calls in, not on this method batching them under one
    /// backend transaction.
    async fn set_fields(&self, id: &str, fields: &[(&str, &str)]) -> MetaResult<()> {
        for (field, value) in fields {
            self.set_field(id, field, value).await?;
        }
        Ok(())
    }

    /// Liveness probe: any successful round-trip confirms connectivity.
    /// The default goes through `exists` on an arbitrary key, which is
    /// enough for implementations (Redis) whose connection is otherwise
    /// established lazily.
    async fn ping(&self) -> MetaResult<()> {
        self.exists("__heartbeat__").await.map(|_| ())
    }
}
