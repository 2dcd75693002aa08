//! Business logic tying the blob broker, metadata store, and auth verifier
//! together: upload planning/completion, download handoff/accounting, owner
//! actions, and limit-driven lifecycle cleanup.

pub mod download;
pub mod lifecycle;
pub mod owner;
pub mod parts;
pub mod record;
pub mod upload;

use std::sync::Arc;

use xfer_auth::AuthVerifier;
use xfer_blob::BlobBroker;
use xfer_core::AppConfig;
use xfer_meta::FieldStore;

pub use download::DownloadCoordinator;
pub use lifecycle::LifecyclePolicy;
pub use owner::OwnerActions;
pub use record::FileRecord;
pub use upload::UploadCoordinator;

/// Bundles the three coordinators and owner-action surface behind one
/// construction point, wired from the same broker/store/config instances.
pub struct Coordinator {
    pub upload: UploadCoordinator,
    pub download: DownloadCoordinator,
    pub owner: OwnerActions,
    pub lifecycle: Arc<LifecyclePolicy>,
    blob: Arc<dyn BlobBroker>,
    meta: Arc<dyn FieldStore>,
}

impl Coordinator {
    pub fn new(blob: Arc<dyn BlobBroker>, meta: Arc<dyn FieldStore>, config: Arc<AppConfig>) -> Self {
        let auth = Arc::new(AuthVerifier::new(meta.clone()));
        let lifecycle = Arc::new(LifecyclePolicy::new(
            blob.clone(),
            meta.clone(),
            config.download.download_grace,
        ));

        Self {
            upload: UploadCoordinator::new(blob.clone(), meta.clone(), config.clone()),
            download: DownloadCoordinator::new(
                blob.clone(),
                meta.clone(),
                auth,
                lifecycle.clone(),
                config.clone(),
            ),
            owner: OwnerActions::new(blob.clone(), meta.clone(), config),
            lifecycle,
            blob,
            meta,
        }
    }

    /// Round-trips both backends; used by the heartbeat endpoint to report
    /// real liveness rather than just process uptime.
    pub async fn ping(&self) -> xfer_core::XferResult<()> {
        self.blob
            .ping()
            .await
            .map_err(xfer_core::backend_unavailable("blob store"))?;
        self.meta
            .ping()
            .await
            .map_err(xfer_core::backend_unavailable("metadata store"))?;
        Ok(())
    }
}
