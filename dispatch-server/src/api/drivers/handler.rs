use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use shared::DriverProfile;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::{AppError, AppResponse, AppResult, ok};

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    pub is_approved: bool,
    pub is_blocked: bool,
}

pub async fn get_profile(
    State(state): State<ServerState>,
    Path(driver_id): Path<String>,
) -> AppResult<Json<AppResponse<DriverProfile>>> {
    let profile = state
        .profiles()
        .get(&driver_id)
        .ok_or_else(|| AppError::NotFound(format!("Driver profile {}", driver_id)))?;
    Ok(ok(profile))
}

/// Eligibility changes apply to the next accept call
pub async fn upsert_profile(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(driver_id): Path<String>,
    Json(req): Json<ProfileRequest>,
) -> AppResult<Json<AppResponse<DriverProfile>>> {
    if driver_id.trim().is_empty() {
        return Err(AppError::validation("driver id is required"));
    }

    let mut profile = DriverProfile::new(driver_id.as_str(), req.is_approved, req.is_blocked);
    profile.display_name = req.display_name;
    state.profiles().upsert(profile.clone());

    tracing::info!(
        driver_id = %driver_id,
        approved = profile.is_approved,
        blocked = profile.is_blocked,
        "Driver profile updated"
    );
    crate::audit_log!(
        user.user_id.as_str(),
        "driver.profile",
        driver_id.as_str(),
        format!("approved={} blocked={}", profile.is_approved, profile.is_blocked)
    );
    Ok(ok(profile))
}
