//! Lifecycle Policy: limit-driven deletion with a grace window. TTL-driven
//! expiry is the metadata store's own job (the hash key simply disappears);
//! this module only handles the case the store can't express on its own —
//! "delete once `dl` reaches `dlimit`, but not before an in-flight download
//! has had a chance to finish".

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument};
use xfer_blob::BlobBroker;
use xfer_core::FileId;
use xfer_meta::FieldStore;

pub struct LifecyclePolicy {
    blob: Arc<dyn BlobBroker>,
    meta: Arc<dyn FieldStore>,
    grace: Duration,
}

impl LifecyclePolicy {
    pub fn new(blob: Arc<dyn BlobBroker>, meta: Arc<dyn FieldStore>, grace: Duration) -> Self {
        Self { blob, meta, grace }
    }

    /// Fires a background task that deletes the blob and record after the
    /// grace window. A missed deletion (process restart mid-grace) is
    /// tolerated: the record's own TTL still bounds its lifetime, and a
    /// repeat `delete` is idempotent.
    #[instrument(skip(self))]
    pub fn schedule_deletion(&self, id: FileId) {
        let blob = self.blob.clone();
        let meta = self.meta.clone();
        let grace = self.grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Err(e) = blob.delete(id.as_str()).await {
                error!(file_id = %id, error = %e, "failed to delete blob after download limit reached");
            }
            if let Err(e) = meta.del(id.as_str()).await {
                error!(file_id = %id, error = %e, "failed to delete metadata record after download limit reached");
            } else {
                info!(file_id = %id, "record deleted after download limit reached");
            }
        });
    }
}
