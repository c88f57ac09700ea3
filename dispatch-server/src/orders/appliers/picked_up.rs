//! PickedUp event applier

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, OrderStatus};

/// PickedUp applier
pub struct PickedUpApplier;

impl EventApplier for PickedUpApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::PickedUp { pickup_photo_url } = &event.payload {
            snapshot.pickup_photo_url = Some(pickup_photo_url.clone());
            snapshot.status = OrderStatus::PickedUp;

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}
