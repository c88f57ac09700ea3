use axum::{
    Json,
    extract::{Query, State},
};
use shared::RejectionLogEntry;
use shared::rejection::RejectionFilter;

use crate::core::ServerState;
use crate::utils::{AppResponse, AppResult, ok};

/// Rejection log, oldest first; `order_id` and `driver_id` narrow it
pub async fn list(
    State(state): State<ServerState>,
    Query(filter): Query<RejectionFilter>,
) -> AppResult<Json<AppResponse<Vec<RejectionLogEntry>>>> {
    let entries = state
        .blocking(move |orders| orders.list_rejections(&filter))
        .await?;
    Ok(ok(entries))
}
