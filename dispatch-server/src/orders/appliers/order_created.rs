//! OrderCreated event applier

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, OrderStatus};

/// OrderCreated applier
pub struct OrderCreatedApplier;

impl EventApplier for OrderCreatedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::OrderCreated {
            client_id,
            client_name,
            items,
            subtotal,
            delivery_fee,
            total,
            delivery_address,
            pickup_address,
        } = &event.payload
        {
            snapshot.order_id = event.order_id.clone();
            snapshot.client_id = client_id.clone();
            snapshot.client_name = client_name.clone();
            snapshot.items = items.clone();
            snapshot.subtotal = *subtotal;
            snapshot.delivery_fee = *delivery_fee;
            snapshot.total = *total;
            snapshot.delivery_address = delivery_address.clone();
            snapshot.pickup_address = pickup_address.clone();

            snapshot.status = OrderStatus::Pending;
            snapshot.driver_id = None;
            snapshot.created_at = event.timestamp;

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}
