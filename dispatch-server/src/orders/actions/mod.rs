//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles
//! one specific command type.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{OrderCommand, OrderCommandPayload, OrderEvent, OrderSnapshot, OrderStatus};

mod accept_order;
mod assign_driver;
mod cancel_order;
mod complete_delivery;
mod create_order;
mod mark_picked_up;
mod report_issue;
mod start_delivery;

pub use accept_order::AcceptOrderAction;
pub use assign_driver::AssignDriverAction;
pub use cancel_order::CancelOrderAction;
pub use complete_delivery::CompleteDeliveryAction;
pub use create_order::CreateOrderAction;
pub use mark_picked_up::MarkPickedUpAction;
pub use report_issue::ReportIssueAction;
pub use start_delivery::StartDeliveryAction;

/// CommandAction enum - dispatches to concrete action implementations
pub enum CommandAction {
    CreateOrder(CreateOrderAction),
    AcceptOrder(AcceptOrderAction),
    AssignDriver(AssignDriverAction),
    MarkPickedUp(MarkPickedUpAction),
    StartDelivery(StartDeliveryAction),
    CompleteDelivery(CompleteDeliveryAction),
    CancelOrder(CancelOrderAction),
    ReportIssue(ReportIssueAction),
}

/// Manual implementation of CommandHandler for CommandAction
#[async_trait]
impl CommandHandler for CommandAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        match self {
            CommandAction::CreateOrder(action) => action.execute(ctx, metadata).await,
            CommandAction::AcceptOrder(action) => action.execute(ctx, metadata).await,
            CommandAction::AssignDriver(action) => action.execute(ctx, metadata).await,
            CommandAction::MarkPickedUp(action) => action.execute(ctx, metadata).await,
            CommandAction::StartDelivery(action) => action.execute(ctx, metadata).await,
            CommandAction::CompleteDelivery(action) => action.execute(ctx, metadata).await,
            CommandAction::CancelOrder(action) => action.execute(ctx, metadata).await,
            CommandAction::ReportIssue(action) => action.execute(ctx, metadata).await,
        }
    }
}

/// Convert OrderCommand to CommandAction
///
/// This is the ONLY place with a match on OrderCommandPayload.
impl From<&OrderCommand> for CommandAction {
    fn from(cmd: &OrderCommand) -> Self {
        match &cmd.payload {
            OrderCommandPayload::CreateOrder {
                client_id,
                client_name,
                items,
                delivery_address,
                pickup_address,
                delivery_fee,
            } => CommandAction::CreateOrder(CreateOrderAction {
                client_id: client_id.clone(),
                client_name: client_name.clone(),
                items: items.clone(),
                delivery_address: delivery_address.clone(),
                pickup_address: pickup_address.clone(),
                delivery_fee: *delivery_fee,
            }),
            OrderCommandPayload::AcceptOrder {
                order_id,
                driver_id,
            } => CommandAction::AcceptOrder(AcceptOrderAction {
                order_id: order_id.clone(),
                driver_id: driver_id.clone(),
            }),
            OrderCommandPayload::AssignDriver {
                order_id,
                driver_id,
            } => CommandAction::AssignDriver(AssignDriverAction {
                order_id: order_id.clone(),
                driver_id: driver_id.clone(),
            }),
            OrderCommandPayload::MarkPickedUp {
                order_id,
                driver_id,
                pickup_photo_url,
            } => CommandAction::MarkPickedUp(MarkPickedUpAction {
                order_id: order_id.clone(),
                driver_id: driver_id.clone(),
                pickup_photo_url: pickup_photo_url.clone(),
            }),
            OrderCommandPayload::StartDelivery {
                order_id,
                driver_id,
                pickup_photo_url,
            } => CommandAction::StartDelivery(StartDeliveryAction {
                order_id: order_id.clone(),
                driver_id: driver_id.clone(),
                pickup_photo_url: pickup_photo_url.clone(),
            }),
            OrderCommandPayload::CompleteDelivery {
                order_id,
                driver_id,
                delivery_photo_url,
                signature_data,
                notes,
            } => CommandAction::CompleteDelivery(CompleteDeliveryAction {
                order_id: order_id.clone(),
                driver_id: driver_id.clone(),
                delivery_photo_url: delivery_photo_url.clone(),
                signature_data: signature_data.clone(),
                notes: notes.clone(),
            }),
            OrderCommandPayload::CancelOrder { order_id, reason } => {
                CommandAction::CancelOrder(CancelOrderAction {
                    order_id: order_id.clone(),
                    reason: reason.clone(),
                })
            }
            OrderCommandPayload::ReportIssue {
                order_id,
                driver_id,
                note,
            } => CommandAction::ReportIssue(ReportIssueAction {
                order_id: order_id.clone(),
                driver_id: driver_id.clone(),
                note: note.clone(),
            }),
        }
    }
}

// ========== Shared guards ==========

/// Transition legality against the status table
fn ensure_transition(snapshot: &OrderSnapshot, to: OrderStatus) -> Result<(), OrderError> {
    if snapshot.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(OrderError::transition(snapshot.status, to))
    }
}

/// Caller must be the driver holding the order
fn ensure_assigned(snapshot: &OrderSnapshot, driver_id: &str) -> Result<(), OrderError> {
    if snapshot.is_assigned_to(driver_id) {
        Ok(())
    } else {
        Err(OrderError::NotAssignedDriver(snapshot.order_id.clone()))
    }
}

/// Trimmed non-empty text or a validation error naming the field
fn required_text(value: Option<&str>, field: &str) -> Result<String, OrderError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(OrderError::Validation(format!("{} is required", field))),
    }
}
