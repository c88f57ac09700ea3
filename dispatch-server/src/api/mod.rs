//! HTTP API
//!
//! - [`health`] - liveness and component checks
//! - [`orders`] - order lifecycle and dispatch
//! - [`rejections`] - rejection log (admin)
//! - [`wallet`] - driver wallet ledger
//! - [`drivers`] - driver profile flags (admin)
//! - [`sync`] - sequence-based catch-up for polling observers
//! - [`events`] - realtime notification stream

pub mod drivers;
pub mod events;
pub mod health;
pub mod orders;
pub mod rejections;
pub mod sync;
pub mod wallet;

use axum::{Router, middleware};
use http::{HeaderName, HeaderValue};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_identity;
use crate::core::ServerState;

pub use crate::utils::{AppResponse, AppResult};

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    tracing::info!(target: "http_access", "{} {} {}", method, uri, response.status());

    response
}

/// All routes, no middleware or state
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(orders::router())
        .merge(rejections::router())
        .merge(wallet::router())
        .merge(drivers::router())
        .merge(sync::router())
        .merge(events::router())
}

/// Fully configured application
pub fn build_app(state: ServerState) -> Router {
    let timeout = state.config.request_timeout();
    build_router()
        .layer(middleware::from_fn(require_identity))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::with_status_code(
            http::StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
}

#[cfg(test)]
mod tests;
