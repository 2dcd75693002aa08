use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use xfer_core::FileId;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OwnerRequestBody {
    pub owner: String,
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<OwnerRequestBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = FileId::from(id);
    state.coordinator.owner.delete(&id, &body.owner).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct ParamsRequestBody {
    pub owner: String,
    pub dlimit: u32,
}

pub async fn params(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ParamsRequestBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = FileId::from(id);
    state
        .coordinator
        .owner
        .set_params(&id, &body.owner, body.dlimit)
        .await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Serialize)]
pub struct InfoResponseBody {
    pub dl: u32,
    pub dlimit: u32,
    pub ttl: Option<i64>,
}

pub async fn info(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<OwnerRequestBody>,
) -> ApiResult<Json<InfoResponseBody>> {
    let id = FileId::from(id);
    let result = state.coordinator.owner.info(&id, &body.owner).await?;
    Ok(Json(InfoResponseBody {
        dl: result.dl,
        dlimit: result.dlimit,
        ttl: result.ttl,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRequestBody {
    pub owner: String,
    pub auth_key: String,
}

pub async fn password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<PasswordRequestBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = FileId::from(id);
    state
        .coordinator
        .owner
        .set_password(&id, &body.owner, &body.auth_key)
        .await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
