use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};
use validator::ValidationErrors;

use cofound_matching::MatchError;

/// Everything a handler can fail with. Rendered as
/// `{"detail": ..., "code": ...}`; internal errors never show their cause.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    AlreadyRequested(String),

    #[error("{0}")]
    AlreadyConnected(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{message}")]
    RateLimited { message: String, remaining: u32 },

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_)
            | Self::InvalidState(_)
            | Self::AlreadyRequested(_)
            | Self::AlreadyConnected(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidState(_) => "invalid_state",
            Self::AlreadyRequested(_) => "already_requested",
            Self::AlreadyConnected(_) => "already_connected",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::RateLimited { .. } => "rate_limited",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<MatchError> for ApiError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::InvalidInput(msg) => Self::InvalidInput(msg),
            MatchError::NotFound(msg) => Self::NotFound(msg),
            MatchError::Forbidden(msg) => Self::Forbidden(msg),
            MatchError::InvalidState(msg) => Self::InvalidState(msg),
            e @ MatchError::AlreadyRequested => Self::AlreadyRequested(e.to_string()),
            e @ MatchError::AlreadyConnected => Self::AlreadyConnected(e.to_string()),
            MatchError::RateLimited { message, remaining } => Self::RateLimited { message, remaining },
            MatchError::Store(e) => Self::Internal(e),
        }
    }
}

/// Field messages from the request's `#[validate]` rules, in a stable order.
impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{field} is invalid"),
                })
            })
            .collect();
        messages.sort();
        Self::InvalidInput(messages.join("; "))
    }
}

// Extractor rejections carry parser details; callers only see a generic
// message.

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        debug!("Rejected path: {}", rejection.body_text());
        Self::InvalidInput("Invalid ID".into())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        debug!("Rejected query: {}", rejection.body_text());
        Self::InvalidInput("Invalid query parameters".into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Rejected body: {}", rejection.body_text());
        Self::InvalidInput("Invalid request body".into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Internal(e) => {
                error!("Internal error: {:#}", e);
                json!({ "detail": "Internal server error", "code": self.code() })
            }
            Self::RateLimited { message, remaining } => {
                json!({ "detail": message, "code": self.code(), "remaining": remaining })
            }
            other => json!({ "detail": other.to_string(), "code": other.code() }),
        };
        (status, Json(body)).into_response()
    }
}
