//! Maps [`XferError`] onto an HTTP response: status code from the error
//! kind, `{ "error": ... }` body, and a `WWW-Authenticate` challenge header
//! when the error carries one.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;
use xfer_core::{ErrorKind, XferError};

pub struct ApiError(pub XferError);

impl From<XferError> for ApiError {
    fn from(e: XferError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = StatusCode::from_u16(err.kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if err.kind == ErrorKind::Internal {
            error!(error = %err.log_chain(), "internal error");
        }

        let body = Json(err.to_json());
        let mut response = (status, body).into_response();

        if let Some(challenge) = &err.challenge {
            if let Ok(value) = HeaderValue::from_str(&format!("send-v1 {}", challenge.nonce_b64)) {
                response.headers_mut().insert("www-authenticate", value);
            }
        }

        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
