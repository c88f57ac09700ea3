//! ReportIssue command handler
//!
//! The assigned driver flags a problem on a live order. Status is unchanged.

use async_trait::async_trait;

use super::{ensure_assigned, required_text};
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, OrderEvent, OrderEventType};

/// ReportIssue action
#[derive(Debug, Clone)]
pub struct ReportIssueAction {
    pub order_id: String,
    pub driver_id: String,
    pub note: String,
}

#[async_trait]
impl CommandHandler for ReportIssueAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let snapshot = ctx.load_snapshot(&self.order_id)?;

        if snapshot.status.is_terminal() {
            return Err(OrderError::Validation(format!(
                "Cannot report an issue on a {} order",
                snapshot.status
            )));
        }
        ensure_assigned(&snapshot, &self.driver_id)?;
        let note = required_text(Some(&self.note), "issue note")?;

        let seq = ctx.next_sequence();

        let event = OrderEvent::new(
            seq,
            self.order_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_role,
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::IssueReported,
            EventPayload::IssueReported { note },
        );

        Ok(vec![event])
    }
}
