//! Redis-backed implementation of [`FieldStore`]. Each file id is one Redis
//! hash; `expire`/`ttl` operate on the hash key directly, matching Redis's own
//! per-key (not per-field) TTL model.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use crate::error::MetaResult;
use crate::store::FieldStore;

pub struct RedisFieldStore {
    conn: ConnectionManager,
}

impl RedisFieldStore {
    pub async fn connect(url: &str) -> MetaResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl FieldStore for RedisFieldStore {
    async fn set_field(&self, id: &str, field: &str, value: &str) -> MetaResult<()> {
        debug!(id, field, "hset");
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(id, field, value).await?;
        Ok(())
    }

    async fn get_field(&self, id: &str, field: &str) -> MetaResult<Option<String>> {
        debug!(id, field, "hget");
        let mut conn = self.conn.clone();
        let v: Option<String> = conn.hget(id, field).await?;
        Ok(v)
    }

    async fn get_all(&self, id: &str) -> MetaResult<HashMap<String, String>> {
        debug!(id, "hgetall");
        let mut conn = self.conn.clone();
        let v: HashMap<String, String> = conn.hgetall(id).await?;
        Ok(v)
    }

    async fn del_field(&self, id: &str, fields: &[&str]) -> MetaResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        debug!(id, ?fields, "hdel");
        let mut conn = self.conn.clone();
        conn.hdel::<_, _, ()>(id, fields).await?;
        Ok(())
    }

    async fn incr(&self, id: &str, field: &str, delta: i64) -> MetaResult<i64> {
        debug!(id, field, delta, "hincrby");
        let mut conn = self.conn.clone();
        let v: i64 = conn.hincr(id, field, delta).await?;
        Ok(v)
    }

    async fn expire(&self, id: &str, seconds: u64) -> MetaResult<()> {
        debug!(id, seconds, "expire");
        let mut conn = self.conn.clone();
        conn.expire::<_, ()>(id, seconds as i64).await?;
        Ok(())
    }

    async fn ttl(&self, id: &str) -> MetaResult<Option<i64>> {
        debug!(id, "ttl");
        let mut conn = self.conn.clone();
        let v: i64 = conn.ttl(id).await?;
        Ok(if v < 0 { None } else { Some(v) })
    }

    async fn exists(&self, id: &str) -> MetaResult<bool> {
        debug!(id, "exists");
        let mut conn = self.conn.clone();
        let v: bool = conn.exists(id).await?;
        Ok(v)
    }

    async fn del(&self, id: &str) -> MetaResult<()> {
        debug!(id, "del");
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(id).await?;
        Ok(())
    }
}
