use axum::{
    Router,
    extract::{Path, State},
    http::HeaderMap,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::notification::Notification;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::get_current_user};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}/read", post(mark_read))
}

/// GET /notifications
async fn list_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<ResponseJson<ApiResponse<Vec<Notification>>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    let notifications = Notification::find_by_user(&state.db.pool, ctx.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(notifications)))
}

/// POST /notifications/{id}/read
async fn mark_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    Notification::mark_read(&state.db.pool, id, ctx.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}
