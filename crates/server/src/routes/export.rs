use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
    routing::get,
};
use db::models::paper::Paper;
use services::services::export::papers_csv;
use uuid::Uuid;

use crate::{
    AppState, error::ApiError, middleware::get_current_user, routes::conferences::require_chair,
};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/conferences/{id}/export/papers.csv",
        get(export_papers_csv),
    )
}

/// GET /conferences/{id}/export/papers.csv
///
/// Chair-only CSV of every paper with its review tallies and payment
/// state, served as a download.
async fn export_papers_csv(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conference_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    require_chair(&state, &ctx, conference_id).await?;

    let rows = Paper::export_rows(&state.db.pool, conference_id).await?;
    let csv = papers_csv(&rows)
        .map_err(|e| ApiError::InternalError(format!("CSV export failed: {}", e)))?;

    let response = (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"papers.csv\"",
            ),
        ],
        csv,
    )
        .into_response();
    Ok(response)
}
