//! Error handling for the fabrication operations backend
//!
//! Every failure is rendered as `{ "error": { "code", "message", "field" } }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::cutting::CuttingError;
use shared::ledger_math::LedgerError;
use shared::models::{ConfirmError, TransitionError};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business rule errors
    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    // External service errors
    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingToken
            | AppError::TokenExpired
            | AppError::InvalidToken
            | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation { .. } | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StateConflict(_) => StatusCode::CONFLICT,
            AppError::InvariantViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::Configuration(_)
            | AppError::DatabaseError(_)
            | AppError::Internal(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ConfirmError> for AppError {
    fn from(err: ConfirmError) -> Self {
        match err {
            ConfirmError::MissingProject => {
                AppError::validation("project_id", "Sales order has no project to derive parts from")
            }
            other => AppError::StateConflict(other.to_string()),
        }
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::NonPositiveQuantity | TransitionError::ExceedsRemaining { .. } => {
                AppError::validation("quantity", err.to_string())
            }
            TransitionError::InvalidTransition { .. } | TransitionError::NotTracked => {
                AppError::StateConflict(err.to_string())
            }
        }
    }
}

impl From<CuttingError> for AppError {
    fn from(err: CuttingError) -> Self {
        match err {
            CuttingError::CutExceedsStock { .. } => AppError::InvariantViolation(err.to_string()),
            CuttingError::EmptyMenu | CuttingError::InvalidStockLength(_) => {
                AppError::validation("stock_lengths", err.to_string())
            }
            CuttingError::InvalidCutLength(_) => {
                AppError::validation("required_lengths", err.to_string())
            }
            CuttingError::NegativeKerf => AppError::validation("kerf", err.to_string()),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NonPositiveQuantity(_) => AppError::validation("quantity", err.to_string()),
            LedgerError::ReleaseExceedsReserved { .. } => {
                AppError::InvariantViolation(err.to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let first = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                (field.to_string(), message)
            });
        match first {
            Some((field, message)) => AppError::Validation { field, message },
            None => AppError::ValidationError(errors.to_string()),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message, field) = match &self {
            AppError::MissingToken => (
                "MISSING_TOKEN",
                "Missing or invalid Authorization header".to_string(),
                None,
            ),
            AppError::TokenExpired => ("TOKEN_EXPIRED", "Token has expired".to_string(), None),
            AppError::InvalidToken => ("INVALID_TOKEN", "Invalid token".to_string(), None),
            AppError::Unauthorized(msg) => ("UNAUTHORIZED", msg.clone(), None),
            AppError::Validation { field, message } => {
                ("VALIDATION_ERROR", message.clone(), Some(field.clone()))
            }
            AppError::ValidationError(msg) => ("VALIDATION_ERROR", msg.clone(), None),
            AppError::NotFound(resource) => ("NOT_FOUND", format!("{} not found", resource), None),
            AppError::StateConflict(msg) => ("STATE_CONFLICT", msg.clone(), None),
            AppError::InvariantViolation(msg) => ("INVARIANT_VIOLATION", msg.clone(), None),
            AppError::ExternalService(msg) => (
                "EXTERNAL_SERVICE_ERROR",
                format!("External service error: {}", msg),
                None,
            ),
            AppError::Configuration(msg) => (
                "CONFIGURATION_ERROR",
                format!("Configuration error: {}", msg),
                None,
            ),
            AppError::DatabaseError(_) => {
                ("DATABASE_ERROR", "A database error occurred".to_string(), None)
            }
            AppError::Internal(msg) => ("INTERNAL_ERROR", msg.clone(), None),
            AppError::InternalError(_) => (
                "INTERNAL_ERROR",
                "An internal server error occurred".to_string(),
                None,
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                field,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::SalesOrderStatus;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::validation("q", "bad").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("Part".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::StateConflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InvariantViolation("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(AppError::ExternalService("x".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(AppError::MissingToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_domain_error_mapping() {
        let err: AppError = ConfirmError::NotDraft(SalesOrderStatus::Confirmed).into();
        assert!(matches!(err, AppError::StateConflict(_)));

        let err: AppError = ConfirmError::MissingProject.into();
        assert!(matches!(err, AppError::Validation { .. }));

        let err: AppError = CuttingError::CutExceedsStock {
            cut: Decimal::from(150),
            longest: Decimal::from(144),
        }
        .into();
        assert!(matches!(err, AppError::InvariantViolation(_)));

        let err: AppError = LedgerError::ReleaseExceedsReserved {
            requested: Decimal::from(5),
            held: Decimal::from(2),
        }
        .into();
        assert!(matches!(err, AppError::InvariantViolation(_)));
    }
}
