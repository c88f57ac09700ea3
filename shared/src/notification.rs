//! Realtime notifications
//!
//! One notification is published per committed state change. Delivery is
//! at-least-once, so observers dedupe on [`DispatchNotification::dedup_key`].

use crate::order::{OrderSnapshot, OrderStatus};
use crate::rejection::RejectionLogEntry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchNotification {
    /// Post-transition order state
    OrderChanged { sequence: u64, order: OrderSnapshot },
    /// A driver declined an order
    RejectionLogged {
        sequence: u64,
        entry: RejectionLogEntry,
    },
}

/// Key an observer can use to drop repeated deliveries
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Order(String, OrderStatus),
    Rejection(String),
}

impl DispatchNotification {
    pub fn sequence(&self) -> u64 {
        match self {
            DispatchNotification::OrderChanged { sequence, .. }
            | DispatchNotification::RejectionLogged { sequence, .. } => *sequence,
        }
    }

    pub fn order_id(&self) -> &str {
        match self {
            DispatchNotification::OrderChanged { order, .. } => &order.order_id,
            DispatchNotification::RejectionLogged { entry, .. } => &entry.order_id,
        }
    }

    /// `(order_id, status)` for order changes, the entry id for rejections
    pub fn dedup_key(&self) -> DedupKey {
        match self {
            DispatchNotification::OrderChanged { order, .. } => {
                DedupKey::Order(order.order_id.clone(), order.status)
            }
            DispatchNotification::RejectionLogged { entry, .. } => {
                DedupKey::Rejection(entry.id.clone())
            }
        }
    }

    /// SSE event name
    pub fn event_name(&self) -> &'static str {
        match self {
            DispatchNotification::OrderChanged { .. } => "order_changed",
            DispatchNotification::RejectionLogged { .. } => "rejection_logged",
        }
    }
}
