use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::TryStreamExt;
use serde::Serialize;
use xfer_core::FileId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()
}

fn with_challenge(mut response: Response, nonce: Option<xfer_core::Nonce>) -> Response {
    if let Some(nonce) = nonce {
        if let Ok(value) = HeaderValue::from_str(&format!("send-v1 {}", nonce.as_b64())) {
            response.headers_mut().insert("www-authenticate", value);
        }
    }
    response
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlResponseBody {
    pub use_signed_url: bool,
    pub url: String,
    pub dl: u32,
    pub dlimit: u32,
}

pub async fn url(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let id = FileId::from(id);
    let result = state.coordinator.download.url(&id, bearer(&headers)).await?;

    let body = Json(UrlResponseBody {
        use_signed_url: true,
        url: result.url,
        dl: result.dl,
        dlimit: result.dlimit,
    });
    Ok(with_challenge(body.into_response(), result.challenge_nonce))
}

pub async fn stream(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let id = FileId::from(id);
    let (stream, nonce) = state.coordinator.download.stream(&id, bearer(&headers)).await?;

    let body = Body::from_stream(stream.map_ok(|b| b));
    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(axum::http::header::CONTENT_TYPE, "application/octet-stream")
        .body(body)
        .map_err(|e| ApiError(xfer_core::XferError::internal(e.to_string())))?;

    response = with_challenge(response, nonce);
    Ok(response)
}

#[derive(Debug, Serialize)]
pub struct MetadataResponseBody {
    pub metadata: String,
    pub ttl: Option<i64>,
    pub encrypted: bool,
}

pub async fn metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let id = FileId::from(id);
    let result = state.coordinator.download.metadata(&id, bearer(&headers)).await?;

    let body = Json(MetadataResponseBody {
        metadata: result.metadata,
        ttl: result.ttl,
        encrypted: result.encrypted,
    });
    Ok(with_challenge(body.into_response(), result.challenge_nonce))
}

#[derive(Debug, Serialize)]
pub struct ExistsResponseBody {
    pub exists: bool,
}

pub async fn exists(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<ExistsResponseBody>> {
    let id = FileId::from(id);
    let exists = state.coordinator.download.exists(&id).await?;
    Ok(Json(ExistsResponseBody { exists }))
}

#[derive(Debug, Serialize)]
pub struct CompleteResponseBody {
    pub deleted: bool,
    pub dl: u32,
    pub dlimit: u32,
}

pub async fn complete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<CompleteResponseBody>> {
    let id = FileId::from(id);
    let result = state.coordinator.download.complete(&id, bearer(&headers)).await?;
    Ok(Json(CompleteResponseBody {
        deleted: result.deleted,
        dl: result.dl,
        dlimit: result.dlimit,
    }))
}

/// `/download/direct/{id}`: unencrypted-only 302 to the signed URL, counter
/// pre-incremented so a client that cancels the redirected GET still counts.
pub async fn direct(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    let id = FileId::from(id);
    let url_result = state.coordinator.download.url(&id, None).await?;
    let _ = state.coordinator.download.complete(&id, None).await?;

    Ok(Response::builder()
        .status(StatusCode::FOUND)
        .header(axum::http::header::LOCATION, url_result.url)
        .body(Body::empty())
        .map_err(|e| ApiError(xfer_core::XferError::internal(e.to_string())))?)
}
