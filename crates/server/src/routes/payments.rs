use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::Json as ResponseJson,
    routing::post,
};
use db::models::{
    conference::{Conference, ConferenceError},
    paper::{Paper, PaperStatus},
    payment::{Payment, PaymentError},
};
use serde::Deserialize;
use services::services::payments::CheckoutSession;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::get_current_user, routes::papers::load_paper};

pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Payment-Signature";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/papers/{id}/checkout", post(create_checkout))
        .route("/webhooks/payment", post(payment_webhook))
}

/// POST /papers/{id}/checkout
///
/// Only the author of an accepted, unpaid paper can start a checkout, and
/// only when the conference charges a registration fee.
async fn create_checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(paper_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<CheckoutSession>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    let paper = load_paper(&state, paper_id).await?;

    if paper.author_id != ctx.user_id {
        return Err(ApiError::Forbidden(
            "Only the author may pay for this paper".to_string(),
        ));
    }
    if paper.status != PaperStatus::Accepted {
        return Err(ApiError::BadRequest(
            "Only accepted papers require registration".into(),
        ));
    }
    if paper.is_paid {
        return Err(ApiError::Conflict("Paper is already paid".into()));
    }

    let conference = Conference::find_by_id(&state.db.pool, paper.conference_id)
        .await?
        .ok_or(ConferenceError::NotFound)?;
    if conference.registration_fee_cents <= 0 {
        return Err(ApiError::BadRequest(
            "This conference does not charge a registration fee".into(),
        ));
    }

    let base = &state.config.public_base_url;
    let session = state
        .gateway
        .create_checkout_session(
            conference.registration_fee_cents,
            paper.id,
            &format!("{}/papers/{}?payment=success", base, paper.id),
            &format!("{}/papers/{}?payment=cancelled", base, paper.id),
        )
        .await?;

    Payment::create(
        &state.db.pool,
        paper.id,
        &session.id,
        conference.registration_fee_cents,
        state.gateway.currency(),
    )
    .await?;

    tracing::info!("Checkout session {} created for paper {}", session.id, paper.id);
    Ok(ResponseJson(ApiResponse::success(session)))
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    event: String,
    session_id: String,
}

/// POST /webhooks/payment
///
/// Verified against the raw body; the JSON is only parsed after the HMAC
/// checks out. Replayed events acknowledge without re-running side
/// effects.
async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing webhook signature".to_string()))?;

    if !state.gateway.verify_webhook_signature(&body, signature) {
        return Err(ApiError::Unauthorized("Invalid webhook signature".to_string()));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Malformed webhook payload: {}", e)))?;

    if event.event != "checkout.completed" {
        tracing::debug!("Ignoring webhook event {}", event.event);
        return Ok(ResponseJson(ApiResponse::success(())));
    }

    let payment = Payment::find_by_gateway_session(&state.db.pool, &event.session_id)
        .await?
        .ok_or(PaymentError::NotFound)?;

    if !Payment::complete(&state.db.pool, payment.id).await? {
        // Replay of an already-completed session.
        return Ok(ResponseJson(ApiResponse::success(())));
    }

    Paper::mark_paid(&state.db.pool, payment.paper_id).await?;
    if let Some(paper) = Paper::find_by_id(&state.db.pool, payment.paper_id).await? {
        state
            .notifier
            .notify_user(
                &state.db.pool,
                paper.author_id,
                "Payment received",
                &format!("Registration for \"{}\" is confirmed.", paper.title),
            )
            .await;
    }

    tracing::info!("Payment {} completed for paper {}", payment.id, payment.paper_id);
    Ok(ResponseJson(ApiResponse::success(())))
}
