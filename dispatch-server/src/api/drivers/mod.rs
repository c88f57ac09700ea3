//! Driver profile API (admin)
//!
//! Stands in for the external profile store so approval and block flags can
//! be managed on a standalone server.

mod handler;

use axum::{
    Router, middleware,
    routing::get,
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/drivers", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route(
            "/{driver_id}/profile",
            get(handler::get_profile).put(handler::upsert_profile),
        )
        .layer(middleware::from_fn(require_admin))
}
