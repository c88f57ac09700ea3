//! CompleteDelivery command handler
//!
//! Final driver step. Needs both a delivery photo and a signature. The
//! wallet credit for this order is written by the manager in the same
//! transaction as the event.

use async_trait::async_trait;

use super::{ensure_assigned, ensure_transition, required_text};
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, OrderEvent, OrderEventType, OrderStatus};

/// CompleteDelivery action
#[derive(Debug, Clone)]
pub struct CompleteDeliveryAction {
    pub order_id: String,
    pub driver_id: String,
    pub delivery_photo_url: Option<String>,
    pub signature_data: Option<String>,
    pub notes: Option<String>,
}

#[async_trait]
impl CommandHandler for CompleteDeliveryAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let snapshot = ctx.load_snapshot(&self.order_id)?;

        ensure_transition(&snapshot, OrderStatus::Delivered)?;
        ensure_assigned(&snapshot, &self.driver_id)?;
        let delivery_photo_url =
            required_text(self.delivery_photo_url.as_deref(), "delivery photo")?;
        let signature_data = required_text(self.signature_data.as_deref(), "signature")?;
        let notes = self
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        let seq = ctx.next_sequence();

        let event = OrderEvent::new(
            seq,
            self.order_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_role,
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::DeliveryCompleted,
            EventPayload::DeliveryCompleted {
                delivery_photo_url,
                signature_data,
                notes,
            },
        );

        Ok(vec![event])
    }
}
