//! Order snapshot - computed state from event stream
//!
//! The snapshot includes a `state_checksum` field for drift detection.
//! A snapshot rebuilt from the event stream must carry the same checksum as
//! the stored one.

use super::types::{DeliveryAddress, OrderItem};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Order status
///
/// ```text
/// pending → (confirmed) → driver_assigned → picked_up ─────────┐
///                                  └──────→ out_for_delivery ──┴→ delivered
///
/// any non-terminal status → cancelled
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    /// Reserved for an upstream payment confirmation step; nothing in the
    /// engine moves an order into it
    Confirmed,
    DriverAssigned,
    PickedUp,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::DriverAssigned,
        OrderStatus::PickedUp,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// `delivered` and `cancelled` never change again
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Statuses in which an order must carry a driver
    pub fn requires_driver(self) -> bool {
        matches!(
            self,
            OrderStatus::DriverAssigned
                | OrderStatus::PickedUp
                | OrderStatus::OutForDelivery
                | OrderStatus::Delivered
        )
    }

    /// The transition table. Every status change in the engine goes through here.
    pub fn can_transition_to(self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, to) {
            (Pending, DriverAssigned) => true,
            (DriverAssigned, PickedUp) => true,
            (DriverAssigned, OutForDelivery) => true,
            (PickedUp, Delivered) | (OutForDelivery, Delivered) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::DriverAssigned => "driver_assigned",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status: {}", s))
    }
}

/// Order snapshot - computed from event stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSnapshot {
    /// Order ID (assigned by server)
    pub order_id: String,
    pub client_id: String,
    pub client_name: String,
    /// Set exactly while status is driver_assigned..delivered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    /// subtotal + delivery_fee, fixed at creation
    pub total: Decimal,
    pub delivery_address: DeliveryAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_address: Option<DeliveryAddress>,
    // Proof of delivery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_notes: Option<String>,
    #[serde(default)]
    pub issue_reported: bool,
    /// Creation time (Unix milliseconds)
    pub created_at: i64,
    /// Last transition time (Unix milliseconds)
    pub updated_at: i64,
    /// Sequence of the last applied event
    pub last_sequence: u64,
    /// Checksum for drift detection
    #[serde(default)]
    pub state_checksum: String,
}

impl OrderSnapshot {
    /// Create an empty snapshot; the creation event fills it in
    pub fn new(order_id: String) -> Self {
        let now = crate::util::now_millis();
        Self {
            order_id,
            client_id: String::new(),
            client_name: String::new(),
            driver_id: None,
            status: OrderStatus::Pending,
            items: Vec::new(),
            subtotal: Decimal::ZERO,
            delivery_fee: Decimal::ZERO,
            total: Decimal::ZERO,
            delivery_address: DeliveryAddress::default(),
            pickup_address: None,
            pickup_photo_url: None,
            delivery_photo_url: None,
            signature_data: None,
            driver_notes: None,
            issue_reported: false,
            created_at: now,
            updated_at: now,
            last_sequence: 0,
            state_checksum: String::new(),
        }
    }

    /// In the pending pool: pending and nobody holds it
    pub fn is_open_for_dispatch(&self) -> bool {
        self.status == OrderStatus::Pending && self.driver_id.is_none()
    }

    pub fn is_assigned_to(&self, driver_id: &str) -> bool {
        self.driver_id.as_deref() == Some(driver_id)
    }

    /// Append a line to `driver_notes`
    pub fn append_note(&mut self, line: &str) {
        self.driver_notes = Some(match self.driver_notes.take() {
            Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, line),
            _ => line.to_string(),
        });
    }

    /// `total == subtotal + delivery_fee` and the driver field matches the status
    pub fn invariants_hold(&self) -> bool {
        self.total == self.subtotal + self.delivery_fee
            && self.driver_id.is_some() == self.status.requires_driver()
    }

    /// Compute checksum from the fields every observer must agree on
    pub fn compute_checksum(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::Hasher as _;

        let mut hasher = DefaultHasher::new();

        self.order_id.hash(&mut hasher);
        self.status.hash(&mut hasher);
        self.driver_id.hash(&mut hasher);
        self.items.len().hash(&mut hasher);

        // Normalized so that 110 and 110.00 hash the same
        self.total.normalize().to_string().hash(&mut hasher);
        self.delivery_fee.normalize().to_string().hash(&mut hasher);

        self.issue_reported.hash(&mut hasher);
        self.last_sequence.hash(&mut hasher);

        format!("{:016x}", hasher.finish())
    }

    /// Update the state_checksum field based on current state
    pub fn update_checksum(&mut self) {
        self.state_checksum = self.compute_checksum();
    }

    /// Returns true if checksum matches, false if drift detected
    pub fn verify_checksum(&self) -> bool {
        self.state_checksum == self.compute_checksum()
    }
}

impl Default for OrderSnapshot {
    fn default() -> Self {
        Self::new(String::new())
    }
}
