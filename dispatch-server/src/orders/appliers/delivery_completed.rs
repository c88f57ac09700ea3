//! DeliveryCompleted event applier
//!
//! Records proof of delivery. Settlement is not an applier concern; the
//! manager writes the ledger credit in the same transaction.

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, OrderStatus};

/// DeliveryCompleted applier
pub struct DeliveryCompletedApplier;

impl EventApplier for DeliveryCompletedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::DeliveryCompleted {
            delivery_photo_url,
            signature_data,
            notes,
        } = &event.payload
        {
            snapshot.delivery_photo_url = Some(delivery_photo_url.clone());
            snapshot.signature_data = Some(signature_data.clone());
            if let Some(notes) = notes {
                snapshot.append_note(notes);
            }
            snapshot.status = OrderStatus::Delivered;

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}
