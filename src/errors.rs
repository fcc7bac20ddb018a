use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use utoipa::ToSchema;

use crate::domain::errors::DomainError;

/// Machine-readable error codes. Stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ValidationError,
    MissingParameter,
    NotFound,
    StaleObject,
    Deadlock,
    IdempotencyKeyMismatch,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::MissingParameter => "MISSING_PARAMETER",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::StaleObject => "STALE_OBJECT",
            ErrorCode::Deadlock => "DEADLOCK",
            ErrorCode::IdempotencyKeyMismatch => "IDEMPOTENCY_KEY_MISMATCH",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub status: u16,
    pub code: String,
    pub message: String,
    #[schema(value_type = Object)]
    pub details: Value,
    /// RFC 3339, UTC.
    pub timestamp: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("Required parameter is missing")]
    MissingParameter(&'static str),

    #[error("Resource not found")]
    NotFound(&'static str),

    #[error("Resource was modified by another request")]
    StaleObject,

    #[error("Transaction deadlock detected")]
    Deadlock,

    #[error("Idempotency key was already used with different request parameters")]
    IdempotencyKeyMismatch,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) => ErrorCode::ValidationError,
            AppError::MissingParameter(_) => ErrorCode::MissingParameter,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::StaleObject => ErrorCode::StaleObject,
            AppError::Deadlock => ErrorCode::Deadlock,
            AppError::IdempotencyKeyMismatch => ErrorCode::IdempotencyKeyMismatch,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    fn details(&self) -> Value {
        match self {
            AppError::Validation(errors) => json!({ "errors": errors }),
            AppError::MissingParameter(parameter) => json!({ "parameter": parameter }),
            AppError::NotFound(resource) => json!({ "resource": resource }),
            AppError::Deadlock => json!({ "suggestion": "Please retry your request" }),
            AppError::IdempotencyKeyMismatch => {
                json!({ "suggestion": "Use a new idempotency key for a different order" })
            }
            AppError::StaleObject | AppError::Internal(_) => json!({}),
        }
    }

    fn public_message(&self) -> String {
        match self {
            // The cause is logged, never echoed to clients.
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorBody {
                status: self.status_code().as_u16(),
                code: self.code().as_str().to_string(),
                message: self.public_message(),
                details: self.details(),
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            },
        }
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(errors) => AppError::Validation(errors),
            DomainError::NotFound(resource) => AppError::NotFound(resource),
            DomainError::StaleObject => AppError::StaleObject,
            DomainError::Deadlock => AppError::Deadlock,
            DomainError::IdempotencyKeyMismatch => AppError::IdempotencyKeyMismatch,
            DomainError::MissingParameter(parameter) => AppError::MissingParameter(parameter),
            DomainError::IdempotencyKeyTaken => {
                AppError::Internal("unresolved idempotency key race".to_string())
            }
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::IdempotencyKeyMismatch => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StaleObject | AppError::Deadlock => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Internal(cause) = self {
            log::error!("Request failed: {}", cause);
        }
        HttpResponse::build(self.status_code()).json(self.envelope())
    }
}
