use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::models::{
    conference::ConferenceError, invite::InviteError, notification::NotificationError,
    paper::PaperError, payment::PaymentError, review::ReviewError, user::UserError,
};
use services::services::{config::ConfigError, payments::PaymentGatewayError};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal Server Error: {0}")]
    InternalError(String),
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Database(e) => ApiError::Database(e),
            UserError::NotFound => ApiError::NotFound("User not found".into()),
            UserError::AlreadyExists => {
                ApiError::Conflict("Username or email already taken".into())
            }
            UserError::InvalidOtp => {
                ApiError::BadRequest("Verification code is invalid or expired".into())
            }
        }
    }
}

impl From<ConferenceError> for ApiError {
    fn from(err: ConferenceError) -> Self {
        match err {
            ConferenceError::Database(e) => ApiError::Database(e),
            ConferenceError::NotFound => ApiError::NotFound("Conference not found".into()),
            ConferenceError::DuplicateTrack => {
                ApiError::Conflict("Track already exists for this conference".into())
            }
        }
    }
}

impl From<PaperError> for ApiError {
    fn from(err: PaperError) -> Self {
        match err {
            PaperError::Database(e) => ApiError::Database(e),
            PaperError::NotFound => ApiError::NotFound("Paper not found".into()),
            PaperError::DeadlinePassed => {
                ApiError::BadRequest("Submission deadline has passed".into())
            }
            PaperError::ConferenceNotOpen => {
                ApiError::BadRequest("Conference is not accepting submissions".into())
            }
        }
    }
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::Database(e) => ApiError::Database(e),
            ReviewError::NotFound => ApiError::NotFound("Review not found".into()),
            ReviewError::AlreadyExists => {
                ApiError::Conflict("A review already exists for this paper and reviewer".into())
            }
            ReviewError::NoRecommendation => {
                ApiError::BadRequest("Review has no pending recommendation to approve".into())
            }
        }
    }
}

impl From<InviteError> for ApiError {
    fn from(err: InviteError) -> Self {
        match err {
            InviteError::Database(e) => ApiError::Database(e),
            InviteError::NotFound => ApiError::NotFound("Invite not found".into()),
            InviteError::AlreadyResolved => {
                ApiError::Conflict("Invite is no longer pending".into())
            }
        }
    }
}

impl From<NotificationError> for ApiError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::Database(e) => ApiError::Database(e),
            NotificationError::NotFound => ApiError::NotFound("Notification not found".into()),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Database(e) => ApiError::Database(e),
            PaymentError::NotFound => ApiError::NotFound("Payment not found".into()),
        }
    }
}

impl From<PaymentGatewayError> for ApiError {
    fn from(err: PaymentGatewayError) -> Self {
        ApiError::InternalError(format!("Payment gateway error: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            ApiError::Database(_) | ApiError::Config(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
        };

        let error_message = match &self {
            // Don't leak internals to clients.
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Internal database error".to_string()
            }
            ApiError::Config(e) => {
                tracing::error!("Configuration error: {}", e);
                "Server misconfiguration".to_string()
            }
            other => other.to_string(),
        };

        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}
