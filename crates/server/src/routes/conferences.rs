use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::conference::{
    Conference, ConferenceError, CreateConference, Track, UpdateConferenceSettings,
};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    middleware::{AccessContext, get_current_user},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/conferences", post(create_conference).get(list_conferences))
        .route("/conferences/{id}", get(get_conference).patch(update_settings))
        .route("/conferences/{id}/approve", post(approve_conference))
        .route("/conferences/{id}/tracks", post(create_track).get(list_tracks))
}

/// Loads the conference and checks the caller chairs it. Superusers pass.
pub(crate) async fn require_chair(
    state: &AppState,
    ctx: &AccessContext,
    conference_id: Uuid,
) -> Result<Conference, ApiError> {
    let conference = Conference::find_by_id(&state.db.pool, conference_id)
        .await?
        .ok_or(ConferenceError::NotFound)?;
    if conference.chair_id != ctx.user_id && !ctx.is_superuser {
        return Err(ApiError::Forbidden(
            "Only the conference chair may do this".to_string(),
        ));
    }
    Ok(conference)
}

/// Chair, PC member, or superuser.
pub(crate) async fn require_committee(
    state: &AppState,
    ctx: &AccessContext,
    conference_id: Uuid,
) -> Result<Conference, ApiError> {
    let conference = Conference::find_by_id(&state.db.pool, conference_id)
        .await?
        .ok_or(ConferenceError::NotFound)?;
    if conference.chair_id == ctx.user_id || ctx.is_superuser {
        return Ok(conference);
    }
    if Conference::is_pc_member(&state.db.pool, conference_id, ctx.user_id).await? {
        return Ok(conference);
    }
    Err(ApiError::Forbidden(
        "Program committee access required".to_string(),
    ))
}

/// POST /conferences
///
/// The caller becomes the chair. New conferences are invisible to others
/// until a superuser approves them.
async fn create_conference(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateConference>,
) -> Result<ResponseJson<ApiResponse<Conference>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Conference name is required".into()));
    }

    let conference = Conference::create(&state.db.pool, ctx.user_id, &payload).await?;
    tracing::info!("Conference {} created by {}", conference.id, ctx.user_id);
    Ok(ResponseJson(ApiResponse::success(conference)))
}

/// GET /conferences
async fn list_conferences(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<ResponseJson<ApiResponse<Vec<Conference>>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    let conferences = Conference::list_visible(&state.db.pool, ctx.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(conferences)))
}

/// GET /conferences/{id}
async fn get_conference(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Conference>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    let conference = Conference::find_by_id(&state.db.pool, id)
        .await?
        .ok_or(ConferenceError::NotFound)?;

    // Unapproved conferences exist only for their chair and superusers.
    if !conference.is_approved && conference.chair_id != ctx.user_id && !ctx.is_superuser {
        return Err(ConferenceError::NotFound.into());
    }
    Ok(ResponseJson(ApiResponse::success(conference)))
}

/// PATCH /conferences/{id}
async fn update_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateConferenceSettings>,
) -> Result<ResponseJson<ApiResponse<Conference>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    require_chair(&state, &ctx, id).await?;

    if let Some(n) = payload.reviewers_per_paper {
        if n < 1 {
            return Err(ApiError::BadRequest(
                "reviewers_per_paper must be at least 1".into(),
            ));
        }
    }
    if let Some(fee) = payload.registration_fee_cents {
        if fee < 0 {
            return Err(ApiError::BadRequest(
                "registration_fee_cents must not be negative".into(),
            ));
        }
    }

    let conference = Conference::update_settings(&state.db.pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(conference)))
}

/// POST /conferences/{id}/approve
async fn approve_conference(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Conference>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    ctx.require_superuser()?;

    let conference = Conference::approve(&state.db.pool, id).await?;
    state
        .notifier
        .notify_user(
            &state.db.pool,
            conference.chair_id,
            "Conference approved",
            &format!(
                "Your conference \"{}\" has been approved and is now open for submissions.",
                conference.name
            ),
        )
        .await;

    Ok(ResponseJson(ApiResponse::success(conference)))
}

#[derive(Debug, Deserialize)]
struct CreateTrackRequest {
    name: String,
}

/// POST /conferences/{id}/tracks
async fn create_track(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateTrackRequest>,
) -> Result<ResponseJson<ApiResponse<Track>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    require_chair(&state, &ctx, id).await?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Track name is required".into()));
    }

    let track = Track::create(&state.db.pool, id, payload.name.trim()).await?;
    Ok(ResponseJson(ApiResponse::success(track)))
}

/// GET /conferences/{id}/tracks
async fn list_tracks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Track>>>, ApiError> {
    get_current_user(&state, &headers).await?;
    let tracks = Track::find_by_conference(&state.db.pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(tracks)))
}
