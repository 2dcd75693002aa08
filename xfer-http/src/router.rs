//! Route table (§6) plus the request-id, trace, and deadline middleware every
//! handler runs under.

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::handlers::{download, health, owner, upload};
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn build(state: AppState) -> Router {
    let deadline_state = state.clone();

    let router = Router::new()
        .route("/config", get(health::config))
        .route("/__heartbeat__", get(health::heartbeat))
        .route("/health", get(health::heartbeat))
        .route("/upload/url", post(upload::plan))
        .route("/upload/complete", post(upload::complete))
        .route("/upload/abort/{id}", post(upload::abort))
        .route("/metadata/{id}", get(download::metadata))
        .route("/exists/{id}", get(download::exists))
        .route("/download/url/{id}", get(download::url))
        .route("/download/{id}", get(download::stream))
        .route("/download/blob/{id}", get(download::stream))
        .route("/download/direct/{id}", get(download::direct))
        .route("/download/complete/{id}", post(download::complete))
        .route("/delete/{id}", post(owner::delete))
        .route("/params/{id}", post(owner::params))
        .route("/info/{id}", post(owner::info))
        .route("/password/{id}", post(owner::password))
        .layer(middleware::from_fn_with_state(deadline_state, request_deadline))
        .with_state(state);

    router
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            REQUEST_ID_HEADER.parse().expect("static header name is valid"),
            MakeRequestUuid,
        ))
}

/// Wraps every handler body in a deadline (§5): a request that doesn't
/// complete within `request_timeout` is abandoned with a retryable 503
/// rather than left to run indefinitely.
async fn request_deadline(State(state): State<AppState>, req: Request, next: Next) -> Result<Response, ApiError> {
    match tokio::time::timeout(state.config.request_timeout, next.run(req)).await {
        Ok(response) => Ok(response),
        Err(_) => Err(ApiError(xfer_core::XferError::backend_unavailable(
            "request exceeded its deadline",
        ))),
    }
}
