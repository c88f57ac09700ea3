//! Order value types, command responses and read filters

use super::snapshot::{OrderSnapshot, OrderStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One line of the client's cart, frozen at checkout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl OrderItem {
    /// `None` on overflow
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Street address used for delivery and pickup
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryAddress {
    pub street: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl DeliveryAddress {
    pub fn is_complete(&self) -> bool {
        !self.street.trim().is_empty() && !self.city.trim().is_empty()
    }

    /// Searchable text fields (lowercase)
    pub fn search_text(&self) -> String {
        let mut text = format!("{} {}", self.street, self.city);
        if let Some(code) = &self.postal_code {
            text.push(' ');
            text.push_str(code);
        }
        text.to_lowercase()
    }
}

/// How a driver came to own an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentSource {
    /// Driver accepted from the pending pool
    DriverAccept,
    /// Admin override
    AdminAssign,
}

/// Command response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// The command ID this responds to
    pub command_id: String,
    /// Whether the command succeeded
    pub success: bool,
    /// Order the command acted on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// Post-transition order state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderSnapshot>,
    /// True when the command id had already been processed
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
    /// Error details if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl CommandResponse {
    pub fn success(command_id: String, order: OrderSnapshot) -> Self {
        Self {
            command_id,
            success: true,
            order_id: Some(order.order_id.clone()),
            order: Some(order),
            duplicate: false,
            error: None,
        }
    }

    pub fn error(command_id: String, error: CommandError) -> Self {
        Self {
            command_id,
            success: false,
            order_id: None,
            order: None,
            duplicate: false,
            error: Some(error),
        }
    }

    pub fn duplicate(command_id: String, order: Option<OrderSnapshot>) -> Self {
        Self {
            command_id,
            success: true,
            order_id: order.as_ref().map(|o| o.order_id.clone()),
            order,
            duplicate: true,
            error: None,
        }
    }
}

/// Command error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandError {
    pub code: CommandErrorCode,
    pub message: String,
}

impl CommandError {
    pub fn new(code: CommandErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Command error codes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandErrorCode {
    OrderNotFound,
    InvalidTransition,
    AlreadyAssigned,
    NotEligible,
    NotAssignedDriver,
    ValidationError,
    InsufficientBalance,
    SettlementInconsistency,
    DuplicateCommand,
    InternalError,
    // Storage errors
    StorageFull,
    OutOfMemory,
    StorageCorrupted,
    SystemBusy,
}

/// Whose orders a listing is restricted to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OrderOwner {
    Client(String),
    Driver(String),
}

/// Conjunctive order filter for admin and history views
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    /// `None` means all statuses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    /// Case-insensitive substring over id, client name and address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OrderOwner>,
}

impl OrderFilter {
    pub fn matches(&self, order: &OrderSnapshot) -> bool {
        if let Some(status) = self.status
            && order.status != status
        {
            return false;
        }

        match &self.owner {
            Some(OrderOwner::Client(id)) if &order.client_id != id => return false,
            Some(OrderOwner::Driver(id)) if !order.is_assigned_to(id) => return false,
            _ => {}
        }

        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                order.order_id.to_lowercase().contains(&needle)
                    || order.client_name.to_lowercase().contains(&needle)
                    || order.delivery_address.search_text().contains(&needle)
                    || order
                        .pickup_address
                        .as_ref()
                        .is_some_and(|a| a.search_text().contains(&needle))
            }
        }
    }
}
