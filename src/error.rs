use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use utoipa::ToSchema;

use crate::identity::IdentityError;
use crate::lifecycle::RuleViolation;
use crate::repo::RepoError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")] BadRequest(String),
    #[error("{0}")] Unauthorized(String),
    #[error("{0}")] Forbidden(String),
    #[error("not found")] NotFound,
    #[error("{0}")] Conflict(String),
    #[error("too many requests")] TooManyRequests,
    #[error("internal error")] Internal,
}

impl From<RuleViolation> for ApiError {
    fn from(v: RuleViolation) -> Self {
        match v {
            RuleViolation::SelfFulfillment | RuleViolation::NotOwner | RuleViolation::NotParticipant => {
                ApiError::Forbidden(v.to_string())
            }
            RuleViolation::InvalidTransition { .. }
            | RuleViolation::NotPending(_)
            | RuleViolation::InsufficientPoints { .. } => {
                ApiError::Conflict(v.to_string())
            }
            RuleViolation::Invalid(msg) => ApiError::BadRequest(msg),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::NotFound,
            RepoError::Conflict => ApiError::Conflict("already exists".into()),
            RepoError::Rule(v) => v.into(),
            RepoError::Internal(msg) => {
                tracing::error!(error = %msg, "store failure");
                ApiError::Internal
            }
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::EmailTaken => ApiError::Conflict(e.to_string()),
            IdentityError::InvalidCredentials => ApiError::Unauthorized(e.to_string()),
            IdentityError::WeakPassword | IdentityError::InvalidEmail | IdentityError::InvalidToken => {
                ApiError::BadRequest(e.to_string())
            }
            IdentityError::NotFound => ApiError::NotFound,
            IdentityError::Internal(msg) => {
                tracing::error!(error = %msg, "identity provider failure");
                ApiError::Internal
            }
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        HttpResponse::build(status).json(ApiErrorBody { error: self.to_string() })
    }
}
