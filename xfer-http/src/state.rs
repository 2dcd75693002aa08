use std::sync::Arc;

use xfer_coordinator::Coordinator;
use xfer_core::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub config: Arc<AppConfig>,
}
