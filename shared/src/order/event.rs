//! Order events - immutable facts recorded after command processing

use super::types::{AssignmentSource, DeliveryAddress, OrderItem};
use crate::identity::Role;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order event - immutable audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Event unique ID
    pub event_id: String,
    /// Global sequence number, the authoritative ordering of transitions
    pub sequence: u64,
    /// Order this event belongs to
    pub order_id: String,
    /// Server timestamp (Unix milliseconds), always set by the server
    pub timestamp: i64,
    /// Client timestamp (Unix milliseconds), kept for audit only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<i64>,
    /// Caller who triggered this event
    pub operator_id: String,
    pub operator_role: Role,
    /// Command that triggered this event
    pub command_id: String,
    pub event_type: OrderEventType,
    pub payload: EventPayload,
}

/// Event type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventType {
    OrderCreated,
    DriverAssigned,
    PickedUp,
    DeliveryStarted,
    DeliveryCompleted,
    OrderCancelled,
    IssueReported,
}

impl std::fmt::Display for OrderEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderEventType::OrderCreated => write!(f, "ORDER_CREATED"),
            OrderEventType::DriverAssigned => write!(f, "DRIVER_ASSIGNED"),
            OrderEventType::PickedUp => write!(f, "PICKED_UP"),
            OrderEventType::DeliveryStarted => write!(f, "DELIVERY_STARTED"),
            OrderEventType::DeliveryCompleted => write!(f, "DELIVERY_COMPLETED"),
            OrderEventType::OrderCancelled => write!(f, "ORDER_CANCELLED"),
            OrderEventType::IssueReported => write!(f, "ISSUE_REPORTED"),
        }
    }
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    OrderCreated {
        client_id: String,
        client_name: String,
        items: Vec<OrderItem>,
        subtotal: Decimal,
        delivery_fee: Decimal,
        total: Decimal,
        delivery_address: DeliveryAddress,
        #[serde(skip_serializing_if = "Option::is_none")]
        pickup_address: Option<DeliveryAddress>,
    },

    DriverAssigned {
        driver_id: String,
        source: AssignmentSource,
    },

    PickedUp {
        pickup_photo_url: String,
    },

    DeliveryStarted {
        pickup_photo_url: String,
    },

    DeliveryCompleted {
        delivery_photo_url: String,
        signature_data: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },

    OrderCancelled {
        reason: String,
        /// Pre-formatted note line, e.g. `[Cancelled by admin a1] reason`
        note: String,
    },

    IssueReported {
        note: String,
    },
}

impl OrderEvent {
    /// Create a new event
    ///
    /// # Arguments
    /// * `sequence` - Global sequence number (authoritative ordering)
    /// * `order_id` - Order this event belongs to
    /// * `operator_id` - Caller who triggered this event
    /// * `operator_role` - Role claim of the caller
    /// * `command_id` - Command that triggered this event
    /// * `client_timestamp` - Client-provided timestamp (for audit, may have clock skew)
    /// * `event_type` - Event type
    /// * `payload` - Event payload
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence: u64,
        order_id: String,
        operator_id: String,
        operator_role: Role,
        command_id: String,
        client_timestamp: Option<i64>,
        event_type: OrderEventType,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            sequence,
            order_id,
            timestamp: chrono::Utc::now().timestamp_millis(),
            client_timestamp,
            operator_id,
            operator_role,
            command_id,
            event_type,
            payload,
        }
    }
}
