//! Upload Coordinator: plans single vs. multipart uploads, mints signed URLs,
//! and finalizes or aborts them.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{info, instrument};
use xfer_blob::{BlobBroker, CompletedPart};
use xfer_core::{AppConfig, FileId, OwnerToken, XferError, XferResult};
use xfer_meta::FieldStore;

use crate::parts::{self, PartPlan};
use crate::record::*;

pub struct UploadCoordinator {
    blob: Arc<dyn BlobBroker>,
    meta: Arc<dyn FieldStore>,
    config: Arc<AppConfig>,
}

pub struct PlanRequest {
    pub file_size: u64,
    pub encrypted: bool,
    pub time_limit: Option<u64>,
    pub dlimit: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct PartUrl {
    pub part_number: u32,
    pub url: String,
    pub min_size: u64,
    pub max_size: u64,
}

pub enum UploadPlan {
    Single {
        id: FileId,
        owner: OwnerToken,
        url: String,
    },
    Multipart {
        id: FileId,
        owner: OwnerToken,
        upload_id: String,
        part_size: u64,
        parts: Vec<PartUrl>,
    },
}

pub struct CompleteRequest {
    pub id: FileId,
    pub metadata: String,
    pub auth_key: Option<String>,
    pub actual_size: Option<u64>,
    pub parts: Option<Vec<CompletedPart>>,
}

pub struct CompleteResult {
    pub share_url: String,
}

impl UploadCoordinator {
    pub fn new(blob: Arc<dyn BlobBroker>, meta: Arc<dyn FieldStore>, config: Arc<AppConfig>) -> Self {
        Self { blob, meta, config }
    }

    #[instrument(skip(self), fields(file_size = req.file_size))]
    pub async fn plan(&self, req: PlanRequest) -> XferResult<UploadPlan> {
        if req.file_size == 0 {
            return Err(XferError::bad_request("fileSize must be greater than zero"));
        }
        if req.file_size > self.config.limits.max_file_size {
            return Err(XferError::file_too_large("fileSize exceeds the maximum allowed"));
        }

        let time_limit = req
            .time_limit
            .unwrap_or(self.config.limits.default_expire_seconds)
            .min(self.config.limits.max_expire_seconds);
        let dlimit = req
            .dlimit
            .unwrap_or(self.config.download.default_downloads)
            .clamp(1, self.config.download.max_downloads);

        let id = FileId::generate();
        let owner = OwnerToken::generate();
        let prefix = (time_limit / 86400).max(1);

        let multipart = parts::use_multipart(req.file_size, &self.config.limits);

        self.meta
            .set_fields(
                id.as_str(),
                &[
                    (FIELD_OWNER, owner.as_str()),
                    (FIELD_ENCRYPTED, if req.encrypted { "true" } else { "false" }),
                    (FIELD_DL, "0"),
                    (FIELD_DLIMIT, &dlimit.to_string()),
                    (FIELD_FILE_SIZE, &req.file_size.to_string()),
                    (FIELD_PREFIX, &prefix.to_string()),
                ],
            )
            .await
            .map_err(xfer_core::backend_unavailable("metadata store"))?;
        self.meta
            .expire(id.as_str(), time_limit)
            .await
            .map_err(xfer_core::backend_unavailable("metadata store"))?;

        if multipart {
            self.plan_multipart(id, owner, req.file_size).await
        } else {
            self.plan_single(id, owner).await
        }
    }

    async fn plan_single(&self, id: FileId, owner: OwnerToken) -> XferResult<UploadPlan> {
        let url = self
            .blob
            .sign_put(id.as_str(), self.config.download.signed_url_ttl)
            .await
            .map_err(xfer_core::backend_unavailable("blob store"))?;
        Ok(UploadPlan::Single { id, owner, url })
    }

    async fn plan_multipart(
        &self,
        id: FileId,
        owner: OwnerToken,
        file_size: u64,
    ) -> XferResult<UploadPlan> {
        let plan: PartPlan = parts::plan_parts(file_size, &self.config.limits)?;

        let upload_id = self
            .blob
            .start_multipart(id.as_str())
            .await
            .map_err(xfer_core::backend_unavailable("blob store"))?;

        self.meta
            .set_fields(
                id.as_str(),
                &[
                    (FIELD_UPLOAD_ID, &upload_id),
                    (FIELD_MULTIPART, "true"),
                    (FIELD_NUM_PARTS, &plan.num_parts.to_string()),
                ],
            )
            .await
            .map_err(xfer_core::backend_unavailable("metadata store"))?;

        let ttl = self.config.download.signed_url_ttl;
        let batch_size = self.config.limits.url_sign_batch_size;
        let mut urls = Vec::with_capacity(plan.num_parts as usize);

        for batch_start in (1..=plan.num_parts).step_by(batch_size) {
            let batch_end = (batch_start + batch_size as u32 - 1).min(plan.num_parts);
            let futs = (batch_start..=batch_end).map(|part_number| {
                let blob = self.blob.clone();
                let key = id.as_str().to_string();
                let upload_id = upload_id.clone();
                async move {
                    blob.sign_part(&key, &upload_id, part_number as i32, ttl)
                        .await
                        .map(|url| (part_number, url))
                }
            });
            let batch_results = try_join_all(futs)
                .await
                .map_err(xfer_core::backend_unavailable("blob store"))?;
            urls.extend(batch_results);
        }

        info!(parts = plan.num_parts, part_size = plan.part_size, "multipart upload planned");

        let part_urls = urls
            .into_iter()
            .map(|(part_number, url)| {
                let (start, end) = parts::part_range(&plan, file_size, part_number);
                let is_final = part_number == plan.num_parts;
                PartUrl {
                    part_number,
                    url,
                    min_size: if is_final { 1 } else { end - start },
                    max_size: end - start,
                }
            })
            .collect();

        Ok(UploadPlan::Multipart {
            id,
            owner,
            upload_id,
            part_size: plan.part_size,
            parts: part_urls,
        })
    }

    #[instrument(skip(self, req), fields(id = %req.id))]
    pub async fn complete(&self, req: CompleteRequest) -> XferResult<CompleteResult> {
        let fields = self
            .meta
            .get_all(req.id.as_str())
            .await
            .map_err(xfer_core::backend_unavailable("metadata store"))?;
        let record = FileRecord::from_fields(&fields)
            .ok_or_else(|| XferError::not_found("upload not found"))?;

        if record.multipart {
            let upload_id = record
                .upload_id
                .clone()
                .ok_or_else(|| XferError::internal("multipart record missing uploadId"))?;
            let num_parts = record.num_parts.unwrap_or(0);
            let mut parts = req
                .parts
                .ok_or_else(|| XferError::bad_request("parts are required to complete a multipart upload"))?;
            if parts.is_empty() {
                return Err(XferError::bad_request("parts must not be empty"));
            }
            if parts.len() as u32 > num_parts {
                return Err(XferError::bad_request("more parts supplied than were planned"));
            }
            parts.sort_by_key(|p| p.part_number);

            self.blob
                .complete_multipart(req.id.as_str(), &upload_id, parts)
                .await
                .map_err(map_complete_error)?;

            self.meta
                .del_field(req.id.as_str(), &[FIELD_UPLOAD_ID, FIELD_MULTIPART, FIELD_NUM_PARTS])
                .await
                .map_err(xfer_core::backend_unavailable("metadata store"))?;
        }

        // Write order matters: metadata first, then auth/nonce, so a reader
        // never observes a fresh nonce paired with no metadata at all.
        self.meta
            .set_field(req.id.as_str(), FIELD_METADATA, &req.metadata)
            .await
            .map_err(xfer_core::backend_unavailable("metadata store"))?;

        if record.encrypted {
            let auth_key = req
                .auth_key
                .ok_or_else(|| XferError::bad_request("authKey is required for encrypted files"))?;
            let nonce = xfer_core::Nonce::generate();
            self.meta
                .set_fields(
                    req.id.as_str(),
                    &[(FIELD_AUTH, &auth_key), (FIELD_NONCE, nonce.as_b64())],
                )
                .await
                .map_err(xfer_core::backend_unavailable("metadata store"))?;
        } else {
            self.meta
                .set_fields(req.id.as_str(), &[(FIELD_AUTH, UNENCRYPTED_SENTINEL), (FIELD_NONCE, "")])
                .await
                .map_err(xfer_core::backend_unavailable("metadata store"))?;
        }

        if let Some(actual_size) = req.actual_size {
            self.meta
                .set_field(req.id.as_str(), FIELD_SIZE, &actual_size.to_string())
                .await
                .map_err(xfer_core::backend_unavailable("metadata store"))?;
        }

        info!("upload completed");

        Ok(CompleteResult {
            share_url: format!(
                "{}/download/{}#{}",
                self.config.public_base_url.trim_end_matches('/'),
                req.id.as_str(),
                record.owner
            ),
        })
    }

    #[instrument(skip(self))]
    pub async fn abort(&self, id: &FileId, upload_id: Option<&str>) -> XferResult<()> {
        if let Some(upload_id) = upload_id {
            // Abort is a no-op success on an unknown or already-completed upload.
            let _ = self.blob.abort_multipart(id.as_str(), upload_id).await;
        }
        let _ = self.meta.del(id.as_str()).await;
        Ok(())
    }
}

fn map_complete_error(err: xfer_blob::BlobError) -> XferError {
    match err {
        xfer_blob::BlobError::UploadNotFound { .. } => {
            XferError::not_found("multipart session has expired")
        }
        xfer_blob::BlobError::Invalid { message } => XferError::bad_request(message),
        other => xfer_core::backend_unavailable("blob store")(other),
    }
}
