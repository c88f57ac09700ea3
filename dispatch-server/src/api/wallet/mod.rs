//! Driver wallet API
//!
//! Drivers reach their own wallet only; admins reach any.
//!
//! | Path | Method |
//! |------|--------|
//! | /api/wallet/{driver_id}/balance | GET |
//! | /api/wallet/{driver_id}/transactions | GET |
//! | /api/wallet/{driver_id}/withdrawals | POST |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/wallet", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/{driver_id}/balance", get(handler::balance))
        .route("/{driver_id}/transactions", get(handler::transactions))
        .route("/{driver_id}/withdrawals", post(handler::withdraw))
}
