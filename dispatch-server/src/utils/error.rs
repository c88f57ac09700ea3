//! HTTP error handling
//!
//! - [`AppError`] - application error enum, rendered through `IntoResponse`
//! - [`AppResponse`] - response envelope shared by successes and failures
//!
//! # Error codes
//!
//! | Code | HTTP | Meaning |
//! |------|------|---------|
//! | E0000 | 200 | Success |
//! | E0002 | 400 | Validation failed |
//! | E0003 | 404 | Resource not found |
//! | E0004 | 409 | Conflict (already assigned, invalid transition) |
//! | E0005 | 422 | Business rule (insufficient balance) |
//! | E0006 | 400 | Invalid request |
//! | E2001 | 403 | Forbidden (role, eligibility, not the assigned driver) |
//! | E3001 | 401 | Missing identity |
//! | E9001 | 500 | Internal error |
//! | E9002 | 500 | Storage error |
//!
//! Engine failures also carry their [`CommandErrorCode`] in `data.reason`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use shared::order::CommandErrorCode;
use tracing::error;

use crate::orders::ManagerError;

/// API response envelope
///
/// ```json
/// { "code": "E0000", "message": "Success", "data": { ... } }
/// ```
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// Machine-readable engine error attached to failed responses
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub reason: CommandErrorCode,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or unreadable identity headers (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Role check failed (403)
    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Invalid request: {0}")]
    Invalid(String),

    /// Engine failure, status chosen by its error code
    #[error(transparent)]
    Dispatch(#[from] ManagerError),
}

impl AppError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// HTTP status and envelope code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "E3001"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "E2001"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "E0003"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "E0002"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "E9001"),
            AppError::Invalid(_) => (StatusCode::BAD_REQUEST, "E0006"),
            AppError::Dispatch(e) => dispatch_status(e.code()),
        }
    }
}

fn dispatch_status(code: CommandErrorCode) -> (StatusCode, &'static str) {
    match code {
        CommandErrorCode::OrderNotFound => (StatusCode::NOT_FOUND, "E0003"),
        CommandErrorCode::InvalidTransition | CommandErrorCode::AlreadyAssigned => {
            (StatusCode::CONFLICT, "E0004")
        }
        CommandErrorCode::NotEligible | CommandErrorCode::NotAssignedDriver => {
            (StatusCode::FORBIDDEN, "E2001")
        }
        CommandErrorCode::ValidationError => (StatusCode::BAD_REQUEST, "E0002"),
        CommandErrorCode::InsufficientBalance => (StatusCode::UNPROCESSABLE_ENTITY, "E0005"),
        CommandErrorCode::StorageFull
        | CommandErrorCode::OutOfMemory
        | CommandErrorCode::StorageCorrupted
        | CommandErrorCode::SystemBusy => (StatusCode::INTERNAL_SERVER_ERROR, "E9002"),
        CommandErrorCode::SettlementInconsistency
        | CommandErrorCode::DuplicateCommand
        | CommandErrorCode::InternalError => (StatusCode::INTERNAL_SERVER_ERROR, "E9001"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() {
            error!(target: "internal", error = %self, code, "Request failed");
            "Internal server error".to_string()
        } else {
            match &self {
                AppError::Dispatch(e) => e.to_string(),
                AppError::Forbidden(msg)
                | AppError::NotFound(msg)
                | AppError::Validation(msg)
                | AppError::Invalid(msg) => msg.clone(),
                AppError::Unauthorized => "Identity headers missing".to_string(),
                AppError::Internal(_) => "Internal server error".to_string(),
            }
        };

        let data = match &self {
            AppError::Dispatch(e) => Some(ErrorDetail { reason: e.code() }),
            _ => None,
        };

        let body = Json(AppResponse {
            code: code.to_string(),
            message,
            data,
            trace_id: None,
        });

        (status, body).into_response()
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("blocking task failed: {}", e))
    }
}

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: "E0000".to_string(),
        message: "Success".to_string(),
        data: Some(data),
        trace_id: None,
    })
}
