//! AcceptOrder command handler
//!
//! A driver claims an order from the pending pool. Runs inside the write
//! transaction, so the `driver_id is None` check and the assignment are one
//! atomic step: of any number of racing drivers exactly one gets the order.
//! The eligibility gate has already been checked by the manager.

use async_trait::async_trait;

use super::ensure_transition;
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{AssignmentSource, EventPayload, OrderEvent, OrderEventType, OrderStatus};

/// AcceptOrder action
#[derive(Debug, Clone)]
pub struct AcceptOrderAction {
    pub order_id: String,
    pub driver_id: String,
}

#[async_trait]
impl CommandHandler for AcceptOrderAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        // 1. Load existing snapshot
        let snapshot = ctx.load_snapshot(&self.order_id)?;

        // 2. Someone already holds it
        if snapshot.driver_id.is_some() {
            return Err(OrderError::AlreadyAssigned(self.order_id.clone()));
        }

        // 3. Unassigned but not pending (cancelled, confirmed)
        ensure_transition(&snapshot, OrderStatus::DriverAssigned)?;

        let seq = ctx.next_sequence();

        let event = OrderEvent::new(
            seq,
            self.order_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_role,
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::DriverAssigned,
            EventPayload::DriverAssigned {
                driver_id: self.driver_id.clone(),
                source: AssignmentSource::DriverAccept,
            },
        );

        Ok(vec![event])
    }
}
