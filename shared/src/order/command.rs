//! Order commands - requests to change an order

use super::types::{DeliveryAddress, OrderItem};
use crate::identity::Role;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Command envelope
///
/// `command_id` is the idempotency key: a command id that has already been
/// processed is acknowledged again without applying anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCommand {
    pub command_id: String,
    /// Client timestamp (Unix milliseconds)
    pub timestamp: i64,
    pub operator_id: String,
    pub operator_role: Role,
    pub payload: OrderCommandPayload,
}

impl OrderCommand {
    pub fn new(operator_id: String, operator_role: Role, payload: OrderCommandPayload) -> Self {
        Self {
            command_id: uuid::Uuid::new_v4().to_string(),
            timestamp: crate::util::now_millis(),
            operator_id,
            operator_role,
            payload,
        }
    }

    /// Replace the generated command id with a caller-supplied one
    pub fn with_command_id(mut self, command_id: impl Into<String>) -> Self {
        self.command_id = command_id.into();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderCommandPayload {
    /// Checkout hands a new order to the engine
    CreateOrder {
        client_id: String,
        client_name: String,
        items: Vec<OrderItem>,
        delivery_address: DeliveryAddress,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pickup_address: Option<DeliveryAddress>,
        delivery_fee: Decimal,
    },
    /// Driver takes an order from the pending pool
    AcceptOrder { order_id: String, driver_id: String },
    /// Admin override, skips the eligibility gate
    AssignDriver { order_id: String, driver_id: String },
    MarkPickedUp {
        order_id: String,
        driver_id: String,
        #[serde(default)]
        pickup_photo_url: Option<String>,
    },
    StartDelivery {
        order_id: String,
        driver_id: String,
        #[serde(default)]
        pickup_photo_url: Option<String>,
    },
    CompleteDelivery {
        order_id: String,
        driver_id: String,
        #[serde(default)]
        delivery_photo_url: Option<String>,
        #[serde(default)]
        signature_data: Option<String>,
        #[serde(default)]
        notes: Option<String>,
    },
    /// Admin cancellation; the operator id is the admin id
    CancelOrder { order_id: String, reason: String },
    ReportIssue {
        order_id: String,
        driver_id: String,
        note: String,
    },
}

impl OrderCommandPayload {
    /// Target order, `None` for creation
    pub fn order_id(&self) -> Option<&str> {
        match self {
            OrderCommandPayload::CreateOrder { .. } => None,
            OrderCommandPayload::AcceptOrder { order_id, .. }
            | OrderCommandPayload::AssignDriver { order_id, .. }
            | OrderCommandPayload::MarkPickedUp { order_id, .. }
            | OrderCommandPayload::StartDelivery { order_id, .. }
            | OrderCommandPayload::CompleteDelivery { order_id, .. }
            | OrderCommandPayload::CancelOrder { order_id, .. }
            | OrderCommandPayload::ReportIssue { order_id, .. } => Some(order_id),
        }
    }

    /// Commands whose commit also writes the wallet ledger
    pub fn settles_wallet(&self) -> bool {
        matches!(self, OrderCommandPayload::CompleteDelivery { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            OrderCommandPayload::CreateOrder { .. } => "create_order",
            OrderCommandPayload::AcceptOrder { .. } => "accept_order",
            OrderCommandPayload::AssignDriver { .. } => "assign_driver",
            OrderCommandPayload::MarkPickedUp { .. } => "mark_picked_up",
            OrderCommandPayload::StartDelivery { .. } => "start_delivery",
            OrderCommandPayload::CompleteDelivery { .. } => "complete_delivery",
            OrderCommandPayload::CancelOrder { .. } => "cancel_order",
            OrderCommandPayload::ReportIssue { .. } => "report_issue",
        }
    }
}
