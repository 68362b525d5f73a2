//! Row types for the business tables.
//!
//! All fields use `#[serde(default)]` so partial projections and embedded
//! selects (e.g. an order row carrying only `clients(name)`) still parse.
//! Timestamps stay as ISO 8601 strings, exactly as the service returns them.

use crate::error::DeskError;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// Clients
// ═══════════════════════════════════════════════════════════════════════════════

/// A customer of the business.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ClientRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Items
// ═══════════════════════════════════════════════════════════════════════════════

/// A sellable item with a unit price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ItemRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Orders
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle of an order on the board.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// The status an order reverts to when stepped backwards. A cancelled
    /// order reopens as pending; pending has nothing before it.
    pub fn previous(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => None,
            OrderStatus::InProgress => Some(OrderStatus::Pending),
            OrderStatus::Completed => Some(OrderStatus::InProgress),
            OrderStatus::Cancelled => Some(OrderStatus::Pending),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "in_progress" => Ok(OrderStatus::InProgress),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DeskError::UnknownStatus(other.to_string())),
        }
    }
}

/// An order row, optionally carrying embedded client and line rows when the
/// select projection asks for them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OrderRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub placed_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, rename = "clients", skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientRecord>,
    #[serde(default, rename = "order_items", skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<OrderItemRecord>>,
}

/// One line of an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OrderItemRecord {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default, rename = "items", skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemRecord>,
}

/// Input for one line when creating an order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub item_id: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl OrderLine {
    pub fn subtotal(&self) -> f64 {
        f64::from(self.quantity) * self.unit_price
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// User status
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-user status row consulted by the activity gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}
