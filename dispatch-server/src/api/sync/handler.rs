use axum::{
    Json,
    extract::{Query, State},
};
use serde::Serialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::orders::{SyncRequest, SyncResponse};
use crate::utils::{AppResponse, AppResult, ok};

pub async fn sync(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(request): Query<SyncRequest>,
) -> AppResult<Json<AppResponse<SyncResponse>>> {
    tracing::debug!(
        user_id = %user.user_id,
        since = request.since_sequence,
        "Sync requested"
    );
    let sync = state.sync.clone();
    let response = tokio::task::spawn_blocking(move || sync.sync(request)).await??;
    Ok(ok(response))
}

#[derive(Debug, Serialize)]
pub struct SyncStatus {
    pub server_sequence: u64,
    pub server_epoch: String,
}

/// Cheap poll: has anything changed since my last sequence?
pub async fn status(
    State(state): State<ServerState>,
    _user: CurrentUser,
) -> AppResult<Json<AppResponse<SyncStatus>>> {
    let server_epoch = state.orders.epoch().to_string();
    let server_sequence = state
        .blocking(|orders| orders.get_current_sequence())
        .await?;
    Ok(ok(SyncStatus {
        server_sequence,
        server_epoch,
    }))
}
