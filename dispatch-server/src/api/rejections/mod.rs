//! Rejection log API
//!
//! | Path | Method | Role |
//! |------|--------|------|
//! | /api/rejections | GET | admin |

mod handler;

use axum::{Router, middleware, routing::get};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/rejections", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list))
        .layer(middleware::from_fn(require_admin))
}
