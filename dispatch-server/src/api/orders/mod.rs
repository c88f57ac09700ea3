//! Order API Module
//!
//! | Path | Method | Role |
//! |------|--------|------|
//! | /api/orders | POST | client, admin |
//! | /api/orders | GET | admin |
//! | /api/orders/mine | GET | client, driver |
//! | /api/orders/pending | GET | driver, admin |
//! | /api/orders/{id} | GET | any |
//! | /api/orders/{id}/events | GET | admin |
//! | /api/orders/{id}/accept | POST | driver |
//! | /api/orders/{id}/reject | POST | driver |
//! | /api/orders/{id}/assign | POST | admin |
//! | /api/orders/{id}/pickup | POST | driver |
//! | /api/orders/{id}/start | POST | driver |
//! | /api/orders/{id}/complete | POST | driver |
//! | /api/orders/{id}/cancel | POST | admin |
//! | /api/orders/{id}/issue | POST | driver |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/mine", get(handler::list_mine))
        .route("/pending", get(handler::list_pending))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/events", get(handler::get_events))
        .route("/{id}/accept", post(handler::accept))
        .route("/{id}/reject", post(handler::reject))
        .route("/{id}/assign", post(handler::assign))
        .route("/{id}/pickup", post(handler::pick_up))
        .route("/{id}/start", post(handler::start_delivery))
        .route("/{id}/complete", post(handler::complete))
        .route("/{id}/cancel", post(handler::cancel))
        .route("/{id}/issue", post(handler::report_issue))
}
