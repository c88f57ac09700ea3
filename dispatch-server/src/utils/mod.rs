//! Utilities
//!
//! - [`AppError`] / [`AppResponse`] - HTTP error and response envelope
//! - [`logger`] - tracing setup and the `audit_log!` / `security_log!` macros

pub mod error;
pub mod logger;

pub use error::{AppError, AppResponse, ErrorDetail, ok};

/// Result type for HTTP handlers
pub type AppResult<T> = Result<T, AppError>;
