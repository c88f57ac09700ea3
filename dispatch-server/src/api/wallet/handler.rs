use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::WalletTransaction;
use shared::wallet::WalletBalance;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::{AppResponse, AppResult, ok};

pub async fn balance(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(driver_id): Path<String>,
) -> AppResult<Json<AppResponse<WalletBalance>>> {
    user.require_self_or_admin(&driver_id)?;
    let balance = state
        .blocking(move |orders| orders.get_balance(&driver_id))
        .await?;
    Ok(ok(balance))
}

/// Ledger entries, oldest first
pub async fn transactions(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(driver_id): Path<String>,
) -> AppResult<Json<AppResponse<Vec<WalletTransaction>>>> {
    user.require_self_or_admin(&driver_id)?;
    let history = state
        .blocking(move |orders| orders.get_wallet_history(&driver_id))
        .await?;
    Ok(ok(history))
}

#[derive(Debug, Deserialize)]
pub struct WithdrawalRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
}

pub async fn withdraw(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(driver_id): Path<String>,
    Json(req): Json<WithdrawalRequest>,
) -> AppResult<Json<AppResponse<WalletTransaction>>> {
    user.require_self_or_admin(&driver_id)?;
    let debit = state
        .blocking(move |orders| orders.record_withdrawal(&driver_id, req.amount, &req.description))
        .await?;
    Ok(ok(debit))
}
