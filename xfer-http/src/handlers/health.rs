use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponseBody {
    pub max_file_size: u64,
    pub max_expire_seconds: u64,
    pub default_expire_seconds: u64,
    pub max_downloads: u32,
    pub default_downloads: u32,
    pub multipart_threshold: u64,
    pub default_part_size: u64,
    pub max_parts: u32,
}

pub async fn config(State(state): State<AppState>) -> Json<ConfigResponseBody> {
    let limits = &state.config.limits;
    let download = &state.config.download;
    Json(ConfigResponseBody {
        max_file_size: limits.max_file_size,
        max_expire_seconds: limits.max_expire_seconds,
        default_expire_seconds: limits.default_expire_seconds,
        max_downloads: download.max_downloads,
        default_downloads: download.default_downloads,
        multipart_threshold: limits.multipart_threshold,
        default_part_size: limits.default_part_size,
        max_parts: limits.max_parts,
    })
}

pub async fn heartbeat(State(state): State<AppState>) -> crate::error::ApiResult<&'static str> {
    state.coordinator.ping().await?;
    Ok("ok")
}
