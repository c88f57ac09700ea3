//! Event applier implementations
//!
//! Each applier implements the `EventApplier` trait and handles
//! one specific event type. Appliers are PURE functions.

use enum_dispatch::enum_dispatch;

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

mod delivery_completed;
mod delivery_started;
mod driver_assigned;
mod issue_reported;
mod order_cancelled;
mod order_created;
mod picked_up;

pub use delivery_completed::DeliveryCompletedApplier;
pub use delivery_started::DeliveryStartedApplier;
pub use driver_assigned::DriverAssignedApplier;
pub use issue_reported::IssueReportedApplier;
pub use order_cancelled::OrderCancelledApplier;
pub use order_created::OrderCreatedApplier;
pub use picked_up::PickedUpApplier;

/// EventAction enum - dispatches to concrete applier implementations
///
/// Uses enum_dispatch for zero-cost static dispatch.
#[enum_dispatch(EventApplier)]
pub enum EventAction {
    OrderCreated(OrderCreatedApplier),
    DriverAssigned(DriverAssignedApplier),
    PickedUp(PickedUpApplier),
    DeliveryStarted(DeliveryStartedApplier),
    DeliveryCompleted(DeliveryCompletedApplier),
    OrderCancelled(OrderCancelledApplier),
    IssueReported(IssueReportedApplier),
}

/// Convert OrderEvent reference to EventAction
///
/// This is the ONLY place with a match on EventPayload.
impl From<&OrderEvent> for EventAction {
    fn from(event: &OrderEvent) -> Self {
        match &event.payload {
            EventPayload::OrderCreated { .. } => EventAction::OrderCreated(OrderCreatedApplier),
            EventPayload::DriverAssigned { .. } => {
                EventAction::DriverAssigned(DriverAssignedApplier)
            }
            EventPayload::PickedUp { .. } => EventAction::PickedUp(PickedUpApplier),
            EventPayload::DeliveryStarted { .. } => {
                EventAction::DeliveryStarted(DeliveryStartedApplier)
            }
            EventPayload::DeliveryCompleted { .. } => {
                EventAction::DeliveryCompleted(DeliveryCompletedApplier)
            }
            EventPayload::OrderCancelled { .. } => {
                EventAction::OrderCancelled(OrderCancelledApplier)
            }
            EventPayload::IssueReported { .. } => EventAction::IssueReported(IssueReportedApplier),
        }
    }
}

/// Fold a full event stream into a fresh snapshot
pub fn replay(order_id: &str, events: &[OrderEvent]) -> OrderSnapshot {
    let mut snapshot = OrderSnapshot::new(order_id.to_string());
    for event in events {
        let applier: EventAction = event.into();
        applier.apply(&mut snapshot, event);
    }
    snapshot
}
