//! Identity middleware

use axum::{extract::Request, middleware::Next, response::Response};

use crate::auth::CurrentUser;
use crate::security_log;
use crate::utils::AppError;

/// Resolve the caller for every `/api/` request
///
/// Injects [`CurrentUser`] into the request extensions. CORS preflight and
/// non-API paths pass through.
pub async fn require_identity(mut req: Request, next: Next) -> Result<Response, AppError> {
    if req.method() == http::Method::OPTIONS || !req.uri().path().starts_with("/api/") {
        return Ok(next.run(req).await);
    }

    match CurrentUser::from_headers(req.headers()) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        Err(e) => {
            security_log!(WARN, "identity_missing", error = %e, uri = %req.uri());
            Err(AppError::Unauthorized)
        }
    }
}

/// Admin-only routes
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AppError::Unauthorized)?;
    user.require_admin()?;
    Ok(next.run(req).await)
}
