//! The File Record: field names as stored in the metadata store, and the
//! typed view the coordinators work with.

use std::collections::HashMap;

pub const FIELD_OWNER: &str = "owner";
pub const FIELD_ENCRYPTED: &str = "encrypted";
pub const FIELD_AUTH: &str = "auth";
pub const FIELD_NONCE: &str = "nonce";
pub const FIELD_METADATA: &str = "metadata";
pub const FIELD_DL: &str = "dl";
pub const FIELD_DLIMIT: &str = "dlimit";
pub const FIELD_FILE_SIZE: &str = "fileSize";
pub const FIELD_SIZE: &str = "size";
pub const FIELD_PREFIX: &str = "prefix";
pub const FIELD_UPLOAD_ID: &str = "uploadId";
pub const FIELD_MULTIPART: &str = "multipart";
pub const FIELD_NUM_PARTS: &str = "numParts";

pub const UNENCRYPTED_SENTINEL: &str = xfer_auth::UNENCRYPTED_SENTINEL;

/// A fully materialized File Record, read back from the metadata store.
/// `metadata`/`auth`/`size` are only populated once the record has left the
/// pending-upload state (see `is_available`).
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub owner: String,
    pub encrypted: bool,
    pub auth: Option<String>,
    pub nonce: Option<String>,
    pub metadata: Option<String>,
    pub dl: u32,
    pub dlimit: u32,
    pub file_size: u64,
    pub size: Option<u64>,
    pub upload_id: Option<String>,
    pub multipart: bool,
    pub num_parts: Option<u32>,
}

impl FileRecord {
    /// `None` if the key was never written or has already expired/been deleted.
    pub fn from_fields(fields: &HashMap<String, String>) -> Option<Self> {
        if fields.is_empty() {
            return None;
        }
        let owner = fields.get(FIELD_OWNER)?.clone();
        let encrypted = fields
            .get(FIELD_ENCRYPTED)
            .map(|v| v == "true")
            .unwrap_or(false);
        let dl = fields
            .get(FIELD_DL)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let dlimit = fields.get(FIELD_DLIMIT).and_then(|v| v.parse().ok())?;
        let file_size = fields.get(FIELD_FILE_SIZE).and_then(|v| v.parse().ok())?;
        let size = fields.get(FIELD_SIZE).and_then(|v| v.parse().ok());
        let multipart = fields
            .get(FIELD_MULTIPART)
            .map(|v| v == "true")
            .unwrap_or(false);

        Some(Self {
            owner,
            encrypted,
            auth: fields.get(FIELD_AUTH).cloned(),
            nonce: fields.get(FIELD_NONCE).cloned(),
            metadata: fields.get(FIELD_METADATA).cloned(),
            dl,
            dlimit,
            file_size,
            size,
            upload_id: fields.get(FIELD_UPLOAD_ID).cloned(),
            multipart,
            num_parts: fields.get(FIELD_NUM_PARTS).and_then(|v| v.parse().ok()),
        })
    }

    /// A record has left the pending-upload state once `metadata` is written;
    /// see the write-ordering contract in the upload coordinator.
    pub fn is_available(&self) -> bool {
        self.metadata.is_some()
    }

    pub fn is_over_limit(&self) -> bool {
        self.dl >= self.dlimit
    }

    pub fn requires_auth(&self) -> bool {
        self.encrypted
    }
}
