//! MarkPickedUp command handler

use async_trait::async_trait;

use super::{ensure_assigned, ensure_transition, required_text};
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, OrderEvent, OrderEventType, OrderStatus};

/// MarkPickedUp action
#[derive(Debug, Clone)]
pub struct MarkPickedUpAction {
    pub order_id: String,
    pub driver_id: String,
    pub pickup_photo_url: Option<String>,
}

#[async_trait]
impl CommandHandler for MarkPickedUpAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let snapshot = ctx.load_snapshot(&self.order_id)?;
        ensure_transition(&snapshot, OrderStatus::PickedUp)?;
        ensure_assigned(&snapshot, &self.driver_id)?;
        let pickup_photo_url = required_text(self.pickup_photo_url.as_deref(), "pickup photo")?;

        let seq = ctx.next_sequence();

        let event = OrderEvent::new(
            seq,
            self.order_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_role,
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::PickedUp,
            EventPayload::PickedUp { pickup_photo_url },
        );

        Ok(vec![event])
    }
}
