//! StartDelivery command handler
//!
//! Moves an assigned order to `out_for_delivery`. Only the assigned driver
//! may do this, and a pickup photo is mandatory.

use async_trait::async_trait;

use super::{ensure_assigned, ensure_transition, required_text};
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, OrderEvent, OrderEventType, OrderStatus};

/// StartDelivery action
#[derive(Debug, Clone)]
pub struct StartDeliveryAction {
    pub order_id: String,
    pub driver_id: String,
    pub pickup_photo_url: Option<String>,
}

#[async_trait]
impl CommandHandler for StartDeliveryAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        // 1. Load existing snapshot
        let snapshot = ctx.load_snapshot(&self.order_id)?;

        // 2. Transition, then ownership, then proof
        ensure_transition(&snapshot, OrderStatus::OutForDelivery)?;
        ensure_assigned(&snapshot, &self.driver_id)?;
        let pickup_photo_url = required_text(self.pickup_photo_url.as_deref(), "pickup photo")?;

        // 3. Allocate sequence number
        let seq = ctx.next_sequence();

        let event = OrderEvent::new(
            seq,
            self.order_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_role,
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::DeliveryStarted,
            EventPayload::DeliveryStarted { pickup_photo_url },
        );

        Ok(vec![event])
    }
}
