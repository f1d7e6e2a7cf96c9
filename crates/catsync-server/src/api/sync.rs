use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use catsync_engine::{CategoryStats, CleanupStats, ProductStats};
use serde::Serialize;

use crate::middleware::RequestId;
use crate::runner::{RunError, SyncStatus, Trigger};

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

/// Body of `POST /api/v1/sync`. Unlike the other routes this is not wrapped in
/// [`ApiResponse`]; callers read `success` at the top level.
#[derive(Debug, Serialize)]
pub(super) struct SyncOutcome {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    categories: Option<CategoryStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    products: Option<ProductStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub(super) async fn trigger_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Response {
    match state.runner.run_sync(Trigger::Api).await {
        Ok(report) => (
            StatusCode::OK,
            Json(SyncOutcome {
                success: true,
                categories: Some(report.categories),
                products: Some(report.products),
                error: None,
            }),
        )
            .into_response(),
        Err(RunError::Busy) => busy(req_id.0).into_response(),
        Err(e) => {
            tracing::error!(request_id = %req_id.0, error = %e, "api: sync failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SyncOutcome {
                    success: false,
                    categories: None,
                    products: None,
                    error: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

pub(super) async fn cleanup_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<CleanupStats>>, ApiError> {
    let stats = state
        .runner
        .cleanup_categories()
        .await
        .map_err(|e| match e {
            RunError::Busy => busy(req_id.0.clone()),
            e => {
                tracing::error!(error = %e, "api: category cleanup failed");
                ApiError::new(req_id.0.clone(), "internal_error", e.to_string())
            }
        })?;

    Ok(Json(ApiResponse {
        data: stats,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn sync_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<SyncStatus>> {
    Json(ApiResponse {
        data: state.runner.status().await,
        meta: ResponseMeta::new(req_id.0),
    })
}

fn busy(request_id: String) -> ApiError {
    ApiError::new(request_id, "conflict", "a sync is already running")
}
