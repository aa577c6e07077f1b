//! Order data model — items, status state machine, and delivery receipt.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line of an order: a material and how much of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub material_name: String,
    /// Unit label copied from the catalog at composition time.
    pub unit: String,
    pub quantity: f64,
}

/// Status of a delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Scheduled, not yet picked up for preparation.
    Pending,
    /// Being prepared for delivery.
    Preparing,
    /// Delivered and receipt-confirmed.
    Delivered,
    /// Cancelled before delivery.
    Cancelled,
}

impl OrderStatus {
    /// Check if this status allows transitioning to another status.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        use OrderStatus::*;

        matches!(
            (self, target),
            // From Pending
            (Pending, Preparing) | (Pending, Delivered) | (Pending, Cancelled) |
            // From Preparing
            (Preparing, Delivered) | (Preparing, Cancelled)
        )
    }

    /// Check if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Preparing => "preparing",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "preparing" => Ok(Self::Preparing),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown order status: {}", s)),
        }
    }
}

/// Proof of delivery captured when an order is confirmed.
///
/// Immutable once attached; the signature is an opaque encoded image blob
/// whose visual content is never inspected here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptData {
    pub full_name: String,
    pub document: String,
    pub received_at: NaiveDate,
    pub signature: String,
}

/// A delivery order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Opaque id.
    pub id: Uuid,
    /// Sequential number scoped to the store; unique, never reused.
    pub order_number: u64,
    pub contact_id: String,
    /// Contact name snapshotted at creation.
    pub contact_name: String,
    pub city: String,
    #[serde(default)]
    pub description: String,
    pub items: Vec<OrderItem>,
    pub delivery_date: NaiveDate,
    pub status: OrderStatus,
    /// Whether an invoice was requested at creation. Immutable.
    pub issue_invoice: bool,
    /// Whether the invoice was actually issued. Togglable, independent of status.
    #[serde(default)]
    pub nf_issued: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ReceiptData>,
}
