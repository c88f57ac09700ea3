//! DeliveryStarted event applier

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, OrderStatus};

/// DeliveryStarted applier
pub struct DeliveryStartedApplier;

impl EventApplier for DeliveryStartedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::DeliveryStarted { pickup_photo_url } = &event.payload {
            snapshot.pickup_photo_url = Some(pickup_photo_url.clone());
            snapshot.status = OrderStatus::OutForDelivery;

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use shared::Role;
    use shared::order::OrderEventType;

    fn create_delivery_started_event(order_id: &str, seq: u64) -> OrderEvent {
        OrderEvent::new(
            seq,
            order_id.to_string(),
            "driver-1".to_string(),
            Role::Driver,
            "cmd-1".to_string(),
            Some(1234567890),
            OrderEventType::DeliveryStarted,
            EventPayload::DeliveryStarted {
                pickup_photo_url: "photos/pickup.jpg".to_string(),
            },
        )
    }

    #[test]
    fn test_delivery_started_sets_status_and_photo() {
        let mut snapshot = OrderSnapshot::new("order-1".to_string());
        snapshot.status = OrderStatus::DriverAssigned;
        snapshot.driver_id = Some("driver-1".to_string());

        DeliveryStartedApplier.apply(&mut snapshot, &create_delivery_started_event("order-1", 3));

        assert_eq!(snapshot.status, OrderStatus::OutForDelivery);
        assert_eq!(snapshot.pickup_photo_url.as_deref(), Some("photos/pickup.jpg"));
        assert_eq!(snapshot.last_sequence, 3);
    }

    #[test]
    fn test_delivery_started_keeps_money_fields() {
        let mut snapshot = OrderSnapshot::new("order-1".to_string());
        snapshot.status = OrderStatus::DriverAssigned;
        snapshot.driver_id = Some("driver-1".to_string());
        snapshot.subtotal = dec!(100.00);
        snapshot.delivery_fee = dec!(10.00);
        snapshot.total = dec!(110.00);

        DeliveryStartedApplier.apply(&mut snapshot, &create_delivery_started_event("order-1", 3));

        assert_eq!(snapshot.total, dec!(110.00));
        assert!(snapshot.invariants_hold());
    }
}
