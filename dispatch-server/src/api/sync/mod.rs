//! Sync API
//!
//! Polling observers catch up with `GET /api/sync?since_sequence=N&epoch=E`.

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/sync", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::sync))
        .route("/status", get(handler::status))
}
