//! Order API Handlers
//!
//! Engine calls are blocking (redb) and run through
//! [`ServerState::blocking`].

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::order::{
    DeliveryAddress, OrderCommand, OrderCommandPayload, OrderEvent, OrderFilter, OrderItem,
    OrderOwner, OrderSnapshot, OrderStatus,
};
use shared::{RejectionLogEntry, Role};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::{AppError, AppResponse, AppResult, ok};

type OrderResponse = AppResult<Json<AppResponse<OrderSnapshot>>>;

/// Checkout payload
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Idempotency key for checkout retries
    #[serde(default)]
    pub command_id: Option<String>,
    /// Required when an admin creates on behalf of a client
    #[serde(default)]
    pub client_id: Option<String>,
    pub client_name: String,
    pub items: Vec<OrderItem>,
    pub delivery_address: DeliveryAddress,
    #[serde(default)]
    pub pickup_address: Option<DeliveryAddress>,
    pub delivery_fee: Decimal,
}

pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(req): Json<CreateOrderRequest>,
) -> OrderResponse {
    user.require_role(&[Role::Client, Role::Admin])?;

    let client_id = match (user.role, req.client_id) {
        (Role::Client, _) => user.user_id.clone(),
        (_, Some(client_id)) if !client_id.trim().is_empty() => client_id,
        _ => return Err(AppError::validation("client_id is required")),
    };

    let mut cmd = OrderCommand::new(
        user.user_id,
        user.role,
        OrderCommandPayload::CreateOrder {
            client_id,
            client_name: req.client_name,
            items: req.items,
            delivery_address: req.delivery_address,
            pickup_address: req.pickup_address,
            delivery_fee: req.delivery_fee,
        },
    );
    if let Some(command_id) = req.command_id {
        cmd = cmd.with_command_id(command_id);
    }

    let order = state.blocking(move |orders| orders.execute(cmd)).await?;
    Ok(ok(order))
}

/// Admin listing filters
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<OrderStatus>,
    pub search: Option<String>,
    pub client_id: Option<String>,
    pub driver_id: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> AppResult<OrderFilter> {
        let owner = match (self.client_id, self.driver_id) {
            (Some(_), Some(_)) => {
                return Err(AppError::validation(
                    "filter by client_id or driver_id, not both",
                ));
            }
            (Some(id), None) => Some(OrderOwner::Client(id)),
            (None, Some(id)) => Some(OrderOwner::Driver(id)),
            (None, None) => None,
        };
        Ok(OrderFilter {
            status: self.status,
            search: self.search,
            owner,
        })
    }
}

pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<AppResponse<Vec<OrderSnapshot>>>> {
    user.require_admin()?;
    let filter = query.into_filter()?;
    let orders = state
        .blocking(move |orders| orders.list_orders(&filter))
        .await?;
    Ok(ok(orders))
}

/// Filters for a caller's own orders
#[derive(Debug, Default, Deserialize)]
pub struct MineQuery {
    pub status: Option<OrderStatus>,
    pub search: Option<String>,
}

pub async fn list_mine(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<MineQuery>,
) -> AppResult<Json<AppResponse<Vec<OrderSnapshot>>>> {
    let owner = match user.role {
        Role::Client => OrderOwner::Client(user.user_id),
        Role::Driver => OrderOwner::Driver(user.user_id),
        _ => return Err(AppError::forbidden("only clients and drivers own orders")),
    };
    let filter = OrderFilter {
        status: query.status,
        search: query.search,
        owner: Some(owner),
    };
    let orders = state
        .blocking(move |orders| orders.list_orders(&filter))
        .await?;
    Ok(ok(orders))
}

/// Pending pool, oldest first
///
/// Drivers only see it while eligible.
pub async fn list_pending(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<AppResponse<Vec<OrderSnapshot>>>> {
    user.require_role(&[Role::Driver, Role::Admin])?;
    if user.is_driver() && !state.profiles().is_eligible(&user.user_id) {
        return Err(AppError::forbidden("driver is not approved or is blocked"));
    }
    let orders = state
        .blocking(|orders| orders.list_pending_orders())
        .await?;
    Ok(ok(orders))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> OrderResponse {
    let order = state.blocking(move |orders| orders.get_order(&id)).await?;

    // Clients only see their own orders
    if user.role == Role::Client && order.client_id != user.user_id {
        return Err(AppError::NotFound(format!("Order {}", order.order_id)));
    }
    Ok(ok(order))
}

pub async fn get_events(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<Vec<OrderEvent>>>> {
    user.require_admin()?;
    let events = state
        .blocking(move |orders| orders.get_order_events(&id))
        .await?;
    Ok(ok(events))
}

// ========== Driver transitions ==========

pub async fn accept(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> OrderResponse {
    user.require_driver()?;
    let order = state
        .blocking(move |orders| orders.accept_order(&id, &user.user_id))
        .await?;
    Ok(ok(order))
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

pub async fn reject(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<RejectRequest>,
) -> AppResult<Json<AppResponse<RejectionLogEntry>>> {
    user.require_driver()?;
    let entry = state
        .blocking(move |orders| orders.reject_order(&id, &user.user_id, &req.reason))
        .await?;
    Ok(ok(entry))
}

#[derive(Debug, Default, Deserialize)]
pub struct PickupRequest {
    #[serde(default)]
    pub pickup_photo_url: Option<String>,
}

pub async fn pick_up(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<PickupRequest>,
) -> OrderResponse {
    user.require_driver()?;
    let order = state
        .blocking(move |orders| {
            orders.mark_picked_up(&id, &user.user_id, req.pickup_photo_url.as_deref())
        })
        .await?;
    Ok(ok(order))
}

pub async fn start_delivery(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<PickupRequest>,
) -> OrderResponse {
    user.require_driver()?;
    let order = state
        .blocking(move |orders| {
            orders.start_delivery(&id, &user.user_id, req.pickup_photo_url.as_deref())
        })
        .await?;
    Ok(ok(order))
}

/// Proof of delivery
#[derive(Debug, Default, Deserialize)]
pub struct CompleteRequest {
    /// Idempotency key for delivery retries
    #[serde(default)]
    pub command_id: Option<String>,
    #[serde(default)]
    pub delivery_photo_url: Option<String>,
    #[serde(default)]
    pub signature_data: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn complete(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<CompleteRequest>,
) -> OrderResponse {
    user.require_driver()?;

    let mut cmd = OrderCommand::new(
        user.user_id.clone(),
        Role::Driver,
        OrderCommandPayload::CompleteDelivery {
            order_id: id,
            driver_id: user.user_id,
            delivery_photo_url: req.delivery_photo_url,
            signature_data: req.signature_data,
            notes: req.notes,
        },
    );
    if let Some(command_id) = req.command_id {
        cmd = cmd.with_command_id(command_id);
    }

    let order = state.blocking(move |orders| orders.execute(cmd)).await?;
    Ok(ok(order))
}

#[derive(Debug, Deserialize)]
pub struct IssueRequest {
    pub note: String,
}

pub async fn report_issue(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<IssueRequest>,
) -> OrderResponse {
    user.require_driver()?;
    let order = state
        .blocking(move |orders| orders.report_issue(&id, &user.user_id, &req.note))
        .await?;
    Ok(ok(order))
}

// ========== Admin transitions ==========

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub driver_id: String,
}

pub async fn assign(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<AssignRequest>,
) -> OrderResponse {
    user.require_admin()?;
    let order = state
        .blocking(move |orders| orders.assign_driver(&id, &req.driver_id, &user.user_id))
        .await?;
    Ok(ok(order))
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<CancelRequest>,
) -> OrderResponse {
    user.require_admin()?;
    let order = state
        .blocking(move |orders| orders.cancel_order(&id, &user.user_id, &req.reason))
        .await?;
    Ok(ok(order))
}
