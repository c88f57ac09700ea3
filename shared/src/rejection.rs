//! Rejection log entries
//!
//! A driver declining an order leaves an audit record here and nothing else:
//! the order keeps its status and stays in the pending pool.

use serde::{Deserialize, Serialize};

/// One driver decline, immutable once written
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RejectionLogEntry {
    pub id: String,
    /// Global sequence shared with order events
    pub sequence: u64,
    pub order_id: String,
    pub driver_id: String,
    pub reason: String,
    pub created_at: i64,
}

/// Filter for rejection log reads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RejectionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
}

impl RejectionFilter {
    pub fn matches(&self, entry: &RejectionLogEntry) -> bool {
        self.order_id.as_deref().is_none_or(|id| id == entry.order_id)
            && self
                .driver_id
                .as_deref()
                .is_none_or(|id| id == entry.driver_id)
    }
}
