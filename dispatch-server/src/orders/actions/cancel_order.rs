//! CancelOrder command handler
//!
//! Admin cancellation of any non-terminal order. The stale order sweeper
//! goes through here too, with the `System` role.

use async_trait::async_trait;

use super::{ensure_transition, required_text};
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::Role;
use shared::order::{EventPayload, OrderEvent, OrderEventType, OrderStatus};

/// CancelOrder action
#[derive(Debug, Clone)]
pub struct CancelOrderAction {
    pub order_id: String,
    pub reason: String,
}

#[async_trait]
impl CommandHandler for CancelOrderAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let snapshot = ctx.load_snapshot(&self.order_id)?;
        ensure_transition(&snapshot, OrderStatus::Cancelled)?;
        let reason = required_text(Some(&self.reason), "cancellation reason")?;

        let note = match metadata.operator_role {
            Role::System => format!("[Cancelled by system] {}", reason),
            _ => format!("[Cancelled by admin {}] {}", metadata.operator_id, reason),
        };
        let seq = ctx.next_sequence();

        let event = OrderEvent::new(
            seq,
            self.order_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_role,
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::OrderCancelled,
            EventPayload::OrderCancelled { reason, note },
        );

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::storage::OrderStorage;
    use shared::order::OrderSnapshot;

    fn create_test_metadata() -> CommandMetadata {
        CommandMetadata {
            command_id: "cmd-1".to_string(),
            operator_id: "admin-7".to_string(),
            operator_role: Role::Admin,
            timestamp: 1234567890,
        }
    }

    fn create_cancel_action(reason: &str) -> CancelOrderAction {
        CancelOrderAction {
            order_id: "order-1".to_string(),
            reason: reason.to_string(),
        }
    }

    #[tokio::test]
    async fn test_cancel_pending_order() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .store_snapshot(&txn, &OrderSnapshot::new("order-1".to_string()))
            .unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let events = create_cancel_action(" client unreachable ")
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        assert_eq!(events[0].event_type, OrderEventType::OrderCancelled);
        if let EventPayload::OrderCancelled { reason, note } = &events[0].payload {
            assert_eq!(reason, "client unreachable");
            assert_eq!(note, "[Cancelled by admin admin-7] client unreachable");
        } else {
            panic!("Expected OrderCancelled payload");
        }
    }

    #[tokio::test]
    async fn test_cancel_in_transit_order() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut snapshot = OrderSnapshot::new("order-1".to_string());
        snapshot.status = OrderStatus::OutForDelivery;
        snapshot.driver_id = Some("driver-1".to_string());
        storage.store_snapshot(&txn, &snapshot).unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let result = create_cancel_action("vehicle breakdown")
            .execute(&mut ctx, &create_test_metadata())
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_terminal_order() {
        for status in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            let storage = OrderStorage::open_in_memory().unwrap();
            let txn = storage.begin_write().unwrap();
            let mut snapshot = OrderSnapshot::new("order-1".to_string());
            snapshot.status = status;
            storage.store_snapshot(&txn, &snapshot).unwrap();

            let mut ctx = CommandContext::new(&txn, &storage, 0);
            let result = create_cancel_action("too late")
                .execute(&mut ctx, &create_test_metadata())
                .await;

            assert_eq!(
                result.unwrap_err(),
                OrderError::transition(status, OrderStatus::Cancelled)
            );
        }
    }

    #[tokio::test]
    async fn test_cancel_requires_reason() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .store_snapshot(&txn, &OrderSnapshot::new("order-1".to_string()))
            .unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let result = create_cancel_action("  ")
            .execute(&mut ctx, &create_test_metadata())
            .await;

        assert!(matches!(result, Err(OrderError::Validation(_))));
    }

    #[tokio::test]
    async fn test_system_cancel_note() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .store_snapshot(&txn, &OrderSnapshot::new("order-1".to_string()))
            .unwrap();

        let metadata = CommandMetadata {
            operator_id: "system".to_string(),
            operator_role: Role::System,
            ..create_test_metadata()
        };
        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let events = create_cancel_action("Expired after 600 seconds in pending")
            .execute(&mut ctx, &metadata)
            .await
            .unwrap();

        if let EventPayload::OrderCancelled { note, .. } = &events[0].payload {
            assert_eq!(note, "[Cancelled by system] Expired after 600 seconds in pending");
        } else {
            panic!("Expected OrderCancelled payload");
        }
    }
}
