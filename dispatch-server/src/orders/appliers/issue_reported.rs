//! IssueReported event applier

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// IssueReported applier
pub struct IssueReportedApplier;

impl EventApplier for IssueReportedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::IssueReported { note } = &event.payload {
            snapshot.issue_reported = true;
            snapshot.append_note(&format!("[Issue reported] {}", note));

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Role;
    use shared::order::{OrderEventType, OrderStatus};

    #[test]
    fn test_issue_reported_flags_order() {
        let mut snapshot = OrderSnapshot::new("order-1".to_string());
        snapshot.status = OrderStatus::OutForDelivery;
        snapshot.driver_id = Some("driver-1".to_string());

        let event = OrderEvent::new(
            4,
            "order-1".to_string(),
            "driver-1".to_string(),
            Role::Driver,
            "cmd-1".to_string(),
            None,
            OrderEventType::IssueReported,
            EventPayload::IssueReported {
                note: "wrong address".to_string(),
            },
        );
        IssueReportedApplier.apply(&mut snapshot, &event);

        assert!(snapshot.issue_reported);
        assert_eq!(snapshot.status, OrderStatus::OutForDelivery);
        assert_eq!(
            snapshot.driver_notes.as_deref(),
            Some("[Issue reported] wrong address")
        );
        assert!(snapshot.verify_checksum());
    }
}
