//! Download Coordinator: signed-URL handoff, stream fallback, completion
//! accounting, and metadata fetch.

use std::sync::Arc;

use tracing::{info, instrument};
use xfer_auth::AuthVerifier;
use xfer_blob::{BlobBroker, ByteStream};
use xfer_core::{AppConfig, FileId, Nonce, XferError, XferResult};
use xfer_meta::FieldStore;

use crate::lifecycle::LifecyclePolicy;
use crate::record::*;

pub struct DownloadCoordinator {
    blob: Arc<dyn BlobBroker>,
    meta: Arc<dyn FieldStore>,
    auth: Arc<AuthVerifier>,
    lifecycle: Arc<LifecyclePolicy>,
    config: Arc<AppConfig>,
}

pub struct UrlResult {
    pub url: String,
    pub dl: u32,
    pub dlimit: u32,
    pub challenge_nonce: Option<Nonce>,
}

pub struct MetadataResult {
    pub metadata: String,
    pub ttl: Option<i64>,
    pub encrypted: bool,
    pub challenge_nonce: Option<Nonce>,
}

pub struct CompleteResult {
    pub dl: u32,
    pub dlimit: u32,
    pub deleted: bool,
}

impl DownloadCoordinator {
    pub fn new(
        blob: Arc<dyn BlobBroker>,
        meta: Arc<dyn FieldStore>,
        auth: Arc<AuthVerifier>,
        lifecycle: Arc<LifecyclePolicy>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            blob,
            meta,
            auth,
            lifecycle,
            config,
        }
    }

    async fn load_record(&self, id: &FileId) -> XferResult<FileRecord> {
        let fields = self
            .meta
            .get_all(id.as_str())
            .await
            .map_err(xfer_core::backend_unavailable("metadata store"))?;
        let record = FileRecord::from_fields(&fields).ok_or_else(|| XferError::not_found("file not found"))?;
        if !record.is_available() {
            return Err(XferError::not_found("file not found"));
        }
        Ok(record)
    }

    /// Runs the §4.3 challenge if the record requires it. Returns the nonce
    /// to surface via `WWW-Authenticate` on the *response*, win or lose.
    async fn authenticate(
        &self,
        id: &FileId,
        record: &FileRecord,
        authorization_header: Option<&str>,
    ) -> XferResult<Option<Nonce>> {
        if !record.requires_auth() {
            return Ok(None);
        }
        match self.auth.verify(id, authorization_header).await {
            Ok(v) => Ok(Some(v.next_nonce)),
            Err(xfer_auth::VerifyError::BadSignature { next_nonce }) => Err(
                XferError::unauthenticated_with_challenge("authentication required", next_nonce.as_b64().to_string()),
            ),
            Err(xfer_auth::VerifyError::NotFound) => Err(XferError::not_found("file not found")),
            Err(xfer_auth::VerifyError::Backend(e)) => {
                Err(xfer_core::backend_unavailable("metadata store")(e))
            }
        }
    }

    #[instrument(skip(self, authorization_header), fields(id = %id))]
    pub async fn url(&self, id: &FileId, authorization_header: Option<&str>) -> XferResult<UrlResult> {
        let record = self.load_record(id).await?;
        let challenge_nonce = self.authenticate(id, &record, authorization_header).await?;

        if record.is_over_limit() {
            return Err(XferError::gone("download limit reached"));
        }

        let filename = extract_filename(&record);
        let url = self
            .blob
            .sign_get(id.as_str(), self.config.download.signed_url_ttl, filename.as_deref())
            .await
            .map_err(xfer_core::backend_unavailable("blob store"))?;

        Ok(UrlResult {
            url,
            dl: record.dl,
            dlimit: record.dlimit,
            challenge_nonce,
        })
    }

    #[instrument(skip(self, authorization_header), fields(id = %id))]
    pub async fn stream(&self, id: &FileId, authorization_header: Option<&str>) -> XferResult<(ByteStream, Option<Nonce>)> {
        let record = self.load_record(id).await?;
        let challenge_nonce = self.authenticate(id, &record, authorization_header).await?;

        if record.is_over_limit() {
            return Err(XferError::gone("download limit reached"));
        }

        let stream = self
            .blob
            .stream_get(id.as_str())
            .await
            .map_err(|e| match e {
                xfer_blob::BlobError::NotFound { .. } => XferError::not_found("file not found"),
                other => xfer_core::backend_unavailable("blob store")(other),
            })?;

        Ok((stream, challenge_nonce))
    }

    #[instrument(skip(self), fields(id = %id))]
    pub async fn metadata(&self, id: &FileId, authorization_header: Option<&str>) -> XferResult<MetadataResult> {
        let record = self.load_record(id).await?;
        let challenge_nonce = self.authenticate(id, &record, authorization_header).await?;
        let ttl = self
            .meta
            .ttl(id.as_str())
            .await
            .map_err(xfer_core::backend_unavailable("metadata store"))?;

        Ok(MetadataResult {
            metadata: record.metadata.unwrap_or_default(),
            ttl,
            encrypted: record.encrypted,
            challenge_nonce,
        })
    }

    pub async fn exists(&self, id: &FileId) -> XferResult<bool> {
        self.meta
            .exists(id.as_str())
            .await
            .map_err(xfer_core::backend_unavailable("metadata store"))
    }

    /// Increments the download counter atomically and, if the limit is now
    /// reached, schedules deletion after the configured grace window.
    #[instrument(skip(self, authorization_header), fields(id = %id))]
    pub async fn complete(&self, id: &FileId, authorization_header: Option<&str>) -> XferResult<CompleteResult> {
        let record = self.load_record(id).await?;
        self.authenticate(id, &record, authorization_header).await?;

        let new_dl = self
            .meta
            .incr(id.as_str(), FIELD_DL, 1)
            .await
            .map_err(xfer_core::backend_unavailable("metadata store"))?;
        let new_dl = new_dl.max(0) as u32;

        let over_limit = new_dl >= record.dlimit;
        if over_limit {
            info!(dl = new_dl, dlimit = record.dlimit, "download limit reached, scheduling deletion");
            self.lifecycle.schedule_deletion(id.clone());
        }

        Ok(CompleteResult {
            dl: new_dl,
            dlimit: record.dlimit,
            deleted: over_limit,
        })
    }
}

/// Best-effort filename extraction from the sealed metadata blob, for the
/// `Content-Disposition` header on unencrypted direct downloads. Encrypted
/// metadata is opaque ciphertext to the server and yields no filename.
fn extract_filename(record: &FileRecord) -> Option<String> {
    if record.encrypted {
        return None;
    }
    let raw = record.metadata.as_deref()?;
    let decoded = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, raw).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&decoded).ok()?;
    value
        .get("files")
        .and_then(|f| f.get(0))
        .and_then(|f| f.get("name"))
        .and_then(|n| n.as_str())
        .map(|s| s.to_string())
}
