use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;
use crate::utils::TimeoutError;

pub type Result<T> = std::result::Result<T, AppError>;

/// Request-level failures. Everything here surfaces to the client as an HTTP error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let code = self.status_code();
        let message = match self {
            AppError::BadRequest(msg)
            | AppError::Store(msg)
            | AppError::ServiceUnavailable(msg) => msg.clone(),
        };

        HttpResponse::build(code).json(ErrorResponse {
            error: message,
            code: code.as_u16(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AppError::ServiceUnavailable(msg),
            StoreError::InvalidCursor(raw) => {
                AppError::BadRequest(format!("invalid lastKey: {raw}"))
            }
            other => AppError::Store(other.to_string()),
        }
    }
}

impl From<TimeoutError> for AppError {
    fn from(err: TimeoutError) -> Self {
        AppError::ServiceUnavailable(err.to_string())
    }
}

/// Recoverable problems with a single input row. Scoring substitutes a safe
/// default (age 0, weight 0) and carries on; the issue is logged and reported
/// alongside the result.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityIssue {
    #[error("unparsable timestamp {raw:?} on {id}")]
    MalformedTimestamp { id: String, raw: String },

    #[error("future-dated timestamp {raw:?} on {id}")]
    FutureTimestamp { id: String, raw: String },

    #[error("net score {score} below -1 on {id}, clamped to 0")]
    NegativeScoreClamped { id: String, score: i64 },
}

/// Why the personalized path degraded to Hot ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    MissingProfile,
    MissingJoinedCommunities,
    MissingInteractionHistory,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::MissingProfile => "missing_profile",
            FallbackReason::MissingJoinedCommunities => "missing_joined_communities",
            FallbackReason::MissingInteractionHistory => "missing_interaction_history",
        }
    }
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
