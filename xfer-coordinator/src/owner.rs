//! Owner-gated mutation endpoints: delete, dlimit change, info, password
//! change. All share one precondition — a constant-time match of the
//! caller-supplied token against the stored `owner` field — checked before
//! the record is otherwise touched. A missing record and a wrong token are
//! deliberately indistinguishable to the caller.

use std::sync::Arc;

use tracing::instrument;
use xfer_blob::BlobBroker;
use xfer_core::{AppConfig, FileId, Nonce, OwnerToken, XferError, XferResult};
use xfer_meta::FieldStore;

use crate::record::*;

pub struct OwnerActions {
    blob: Arc<dyn BlobBroker>,
    meta: Arc<dyn FieldStore>,
    config: Arc<AppConfig>,
}

pub struct InfoResult {
    pub dl: u32,
    pub dlimit: u32,
    pub ttl: Option<i64>,
}

impl OwnerActions {
    pub fn new(blob: Arc<dyn BlobBroker>, meta: Arc<dyn FieldStore>, config: Arc<AppConfig>) -> Self {
        Self { blob, meta, config }
    }

    async fn load_and_verify(&self, id: &FileId, owner_token: &str) -> XferResult<FileRecord> {
        let fields = self
            .meta
            .get_all(id.as_str())
            .await
            .map_err(xfer_core::backend_unavailable("metadata store"))?;
        let record = FileRecord::from_fields(&fields)
            .ok_or_else(|| XferError::permission_denied("invalid owner token"))?;
        let owner = OwnerToken::from(record.owner.clone());
        if !owner.verify(owner_token) {
            return Err(XferError::permission_denied("invalid owner token"));
        }
        Ok(record)
    }

    #[instrument(skip(self, owner_token), fields(id = %id))]
    pub async fn delete(&self, id: &FileId, owner_token: &str) -> XferResult<()> {
        let record = self.load_and_verify(id, owner_token).await?;

        if let Some(upload_id) = record.upload_id.as_deref() {
            let _ = self.blob.abort_multipart(id.as_str(), upload_id).await;
        }
        let _ = self.blob.delete(id.as_str()).await;
        self.meta
            .del(id.as_str())
            .await
            .map_err(xfer_core::backend_unavailable("metadata store"))
    }

    #[instrument(skip(self, owner_token), fields(id = %id))]
    pub async fn set_params(&self, id: &FileId, owner_token: &str, new_dlimit: u32) -> XferResult<()> {
        let record = self.load_and_verify(id, owner_token).await?;

        let clamped = new_dlimit.clamp(1, self.config.download.max_downloads);
        if clamped < record.dl {
            return Err(XferError::bad_request(
                "dlimit cannot be set below the number of downloads already served",
            ));
        }

        self.meta
            .set_field(id.as_str(), FIELD_DLIMIT, &clamped.to_string())
            .await
            .map_err(xfer_core::backend_unavailable("metadata store"))
    }

    #[instrument(skip(self, owner_token), fields(id = %id))]
    pub async fn info(&self, id: &FileId, owner_token: &str) -> XferResult<InfoResult> {
        let record = self.load_and_verify(id, owner_token).await?;
        let ttl = self
            .meta
            .ttl(id.as_str())
            .await
            .map_err(xfer_core::backend_unavailable("metadata store"))?;

        Ok(InfoResult {
            dl: record.dl,
            dlimit: record.dlimit,
            ttl,
        })
    }

    #[instrument(skip(self, owner_token, new_auth_key_b64), fields(id = %id))]
    pub async fn set_password(
        &self,
        id: &FileId,
        owner_token: &str,
        new_auth_key_b64: &str,
    ) -> XferResult<()> {
        let record = self.load_and_verify(id, owner_token).await?;
        if !record.encrypted {
            return Err(XferError::bad_request(
                "password can only be set on an encrypted file",
            ));
        }

        let nonce = Nonce::generate();
        // auth before nonce: a reader must never see a fresh nonce paired
        // with the old key.
        self.meta
            .set_field(id.as_str(), FIELD_AUTH, new_auth_key_b64)
            .await
            .map_err(xfer_core::backend_unavailable("metadata store"))?;
        self.meta
            .set_field(id.as_str(), FIELD_NONCE, nonce.as_b64())
            .await
            .map_err(xfer_core::backend_unavailable("metadata store"))?;
        Ok(())
    }
}
