//! DriverAssigned event applier

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, OrderStatus};

/// DriverAssigned applier
pub struct DriverAssignedApplier;

impl EventApplier for DriverAssignedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::DriverAssigned { driver_id, .. } = &event.payload {
            snapshot.driver_id = Some(driver_id.clone());
            snapshot.status = OrderStatus::DriverAssigned;

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}
