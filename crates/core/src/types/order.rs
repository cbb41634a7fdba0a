//! The order aggregate.
//!
//! An order embeds its line items, shipping address, shipment details and
//! tracking events so that a status change is a single write of one record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{OrderId, ProductId, UserId};
use super::price::{AmountError, OrderTotals, checked_amount_add, checked_amount_mul};
use super::status::{OrderStatus, PaymentMethod, PaymentStatus};
use super::tracking::{ShipmentDetails, TrackingEvent};
use crate::timeline::{self, Timeline};

/// A line item as submitted at checkout, before the line subtotal is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLineItem {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// A purchased line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    /// `quantity * unit_price`, rounded to cents.
    pub subtotal: Decimal,
}

impl TryFrom<NewLineItem> for LineItem {
    type Error = AmountError;

    fn try_from(item: NewLineItem) -> Result<Self, Self::Error> {
        let subtotal =
            checked_amount_mul(item.unit_price, Decimal::from(item.quantity), "line subtotal")?;
        Ok(Self {
            product_id: item.product_id,
            name: item.name,
            quantity: item.quantity,
            unit_price: item.unit_price,
            subtotal,
        })
    }
}

/// Where the order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A customer purchase record with items, payment, shipping, and status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: UserId,
    pub items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    #[serde(flatten)]
    pub totals: OrderTotals,
    pub status: OrderStatus,
    #[serde(flatten)]
    pub shipment: ShipmentDetails,
    /// Bumped on every write; status changes are guarded on it.
    pub version: i32,
    /// Oldest first.
    pub events: Vec<TrackingEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether `user` placed this order.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.customer_id == user
    }

    /// Total number of units across all line items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Render the customer-facing timeline for this order.
    #[must_use]
    pub fn timeline(&self) -> Timeline {
        timeline::render(self.status, &self.events)
    }
}

/// Sum of line subtotals.
///
/// # Errors
///
/// Returns [`AmountError`] if the sum exceeds the storable maximum.
pub fn items_subtotal(items: &[LineItem]) -> Result<Decimal, AmountError> {
    items.iter().try_fold(Decimal::ZERO, |sum, item| {
        checked_amount_add(sum, item.subtotal, "subtotal")
    })
}
