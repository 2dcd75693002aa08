use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use xfer_coordinator::upload::{CompleteRequest, PlanRequest, UploadPlan};
use xfer_core::FileId;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequestBody {
    pub file_size: u64,
    #[serde(default)]
    pub encrypted: bool,
    pub time_limit: Option<u64>,
    pub dlimit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase", untagged)]
pub enum PlanResponseBody {
    Single {
        use_signed_url: bool,
        multipart: bool,
        id: String,
        owner: String,
        url: String,
        complete_url: String,
    },
    Multipart {
        use_signed_url: bool,
        multipart: bool,
        id: String,
        owner: String,
        upload_id: String,
        part_size: u64,
        parts: Vec<PartResponse>,
        url: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartResponse {
    pub part_number: u32,
    pub url: String,
    pub min_size: u64,
    pub max_size: u64,
}

pub async fn plan(
    State(state): State<AppState>,
    Json(body): Json<PlanRequestBody>,
) -> ApiResult<Json<PlanResponseBody>> {
    let plan = state
        .coordinator
        .upload
        .plan(PlanRequest {
            file_size: body.file_size,
            encrypted: body.encrypted,
            time_limit: body.time_limit,
            dlimit: body.dlimit,
        })
        .await?;

    let complete_url = format!("{}/upload/complete", state.config.public_base_url.trim_end_matches('/'));

    let response = match plan {
        UploadPlan::Single { id, owner, url } => PlanResponseBody::Single {
            use_signed_url: true,
            multipart: false,
            id: id.to_string(),
            owner: owner.as_str().to_string(),
            url,
            complete_url,
        },
        UploadPlan::Multipart {
            id,
            owner,
            upload_id,
            part_size,
            parts,
        } => PlanResponseBody::Multipart {
            use_signed_url: true,
            multipart: true,
            id: id.to_string(),
            owner: owner.as_str().to_string(),
            upload_id,
            part_size,
            parts: parts
                .into_iter()
                .map(|p| PartResponse {
                    part_number: p.part_number,
                    url: p.url,
                    min_size: p.min_size,
                    max_size: p.max_size,
                })
                .collect(),
            url: complete_url,
        },
    };

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct CompletePart {
    pub part_number: i32,
    pub etag: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequestBody {
    pub id: String,
    pub metadata: String,
    pub auth_key: Option<String>,
    pub actual_size: Option<u64>,
    pub parts: Option<Vec<CompletePart>>,
}

#[derive(Debug, Serialize)]
pub struct CompleteResponseBody {
    pub id: String,
    pub url: String,
}

pub async fn complete(
    State(state): State<AppState>,
    Json(body): Json<CompleteRequestBody>,
) -> ApiResult<Json<CompleteResponseBody>> {
    let id = FileId::from(body.id.clone());
    let result = state
        .coordinator
        .upload
        .complete(CompleteRequest {
            id: id.clone(),
            metadata: body.metadata,
            auth_key: body.auth_key,
            actual_size: body.actual_size,
            parts: body.parts.map(|parts| {
                parts
                    .into_iter()
                    .map(|p| xfer_blob::CompletedPart {
                        part_number: p.part_number,
                        etag: p.etag,
                    })
                    .collect()
            }),
        })
        .await?;

    Ok(Json(CompleteResponseBody {
        id: id.to_string(),
        url: result.share_url,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbortRequestBody {
    pub upload_id: Option<String>,
}

pub async fn abort(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AbortRequestBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = FileId::from(id);
    state
        .coordinator
        .upload
        .abort(&id, body.upload_id.as_deref())
        .await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
