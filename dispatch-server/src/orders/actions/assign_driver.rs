//! AssignDriver command handler
//!
//! Admin override: places a driver on a pending order without the
//! eligibility gate. Uses the same guarded transition as a driver accept.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{AssignmentSource, EventPayload, OrderEvent, OrderEventType};

/// AssignDriver action
#[derive(Debug, Clone)]
pub struct AssignDriverAction {
    pub order_id: String,
    pub driver_id: String,
}

#[async_trait]
impl CommandHandler for AssignDriverAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let snapshot = ctx.load_snapshot(&self.order_id)?;

        // Anything that left the pending pool counts as taken
        if !snapshot.is_open_for_dispatch() {
            return Err(OrderError::AlreadyAssigned(self.order_id.clone()));
        }

        if self.driver_id.trim().is_empty() {
            return Err(OrderError::Validation("driver_id is required".to_string()));
        }

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
                driver_id: self.driver_id.trim().to_string(),
                source: AssignmentSource::AdminAssign,
            },
        );

        Ok(vec![event])
    }
}
