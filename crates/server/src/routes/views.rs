//! JSON response shapes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use order_tracker_core::{
    Order, OrderId, OrderStatus, Timeline, TrackingEvent, TrackingNumber,
};

use crate::services::{BulkFailure, BulkOutcome};

/// Order, its event log and its rendered timeline.
///
/// `T` is the full [`Order`] for the owner and admins, or a
/// [`PublicOrderView`] for tracking-number lookups.
#[derive(Debug, Serialize)]
pub struct TrackingResponse<T> {
    pub order: T,
    /// Oldest first, as stored.
    pub events: Vec<TrackingEvent>,
    pub timeline: Timeline,
}

impl TrackingResponse<Order> {
    /// Full tracking response for an authorised reader.
    #[must_use]
    pub fn full(order: Order) -> Self {
        let timeline = order.timeline();
        let events = order.events.clone();
        Self {
            order,
            events,
            timeline,
        }
    }
}

impl TrackingResponse<PublicOrderView> {
    /// Redacted tracking response for anonymous lookups.
    #[must_use]
    pub fn public(order: &Order) -> Self {
        Self {
            order: PublicOrderView::from(order),
            events: order.events.clone(),
            timeline: order.timeline(),
        }
    }
}

/// An item as shown on the public tracking page.
#[derive(Debug, Serialize)]
pub struct PublicItemView {
    pub name: String,
    pub quantity: u32,
}

/// Where the parcel is headed, without the street address.
#[derive(Debug, Serialize)]
pub struct DestinationView {
    pub city: String,
    pub state: String,
    pub country: String,
}

/// Order summary safe to show to anyone holding the tracking number.
///
/// Omits the customer, payment data, prices and street address.
#[derive(Debug, Serialize)]
pub struct PublicOrderView {
    pub id: OrderId,
    pub status: OrderStatus,
    pub status_label: &'static str,
    pub items: Vec<PublicItemView>,
    pub item_count: u64,
    pub destination: DestinationView,
    pub tracking_number: Option<TrackingNumber>,
    pub carrier: Option<String>,
    pub tracking_url: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for PublicOrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            status: order.status,
            status_label: order.status.label(),
            items: order
                .items
                .iter()
                .map(|item| PublicItemView {
                    name: item.name.clone(),
                    quantity: item.quantity,
                })
                .collect(),
            item_count: order.item_count(),
            destination: DestinationView {
                city: order.shipping_address.city.clone(),
                state: order.shipping_address.state.clone(),
                country: order.shipping_address.country.clone(),
            },
            tracking_number: order.shipment.tracking_number.clone(),
            carrier: order.shipment.carrier.clone(),
            tracking_url: order.shipment.tracking_url.clone(),
            estimated_delivery: order.shipment.estimated_delivery,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Outcome of a bulk status update.
#[derive(Debug, Serialize)]
pub struct BulkUpdateResponse {
    pub requested: usize,
    pub updated: Vec<BulkUpdatedOrder>,
    pub errors: Vec<BulkFailure>,
}

/// An order that a bulk update changed.
#[derive(Debug, Serialize)]
pub struct BulkUpdatedOrder {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

impl From<BulkOutcome> for BulkUpdateResponse {
    fn from(outcome: BulkOutcome) -> Self {
        Self {
            requested: outcome.updated.len() + outcome.failures.len(),
            updated: outcome
                .updated
                .iter()
                .map(|order| BulkUpdatedOrder {
                    order_id: order.id,
                    status: order.status,
                })
                .collect(),
            errors: outcome.failures,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use order_tracker_core::{
        LineItem, NewLineItem, OrderTotals, PaymentMethod, PaymentStatus, ProductId,
        ShipmentDetails, ShippingAddress, UserId,
    };
    use rust_decimal::Decimal;

    use super::*;

    fn order() -> Order {
        Order {
            id: OrderId::new(3),
            customer_id: UserId::new(77),
            items: vec![
                LineItem::try_from(NewLineItem {
                    product_id: ProductId::new(1),
                    name: "Plantain Chips".to_string(),
                    quantity: 2,
                    unit_price: Decimal::new(450, 2),
                })
                .unwrap(),
            ],
            shipping_address: ShippingAddress {
                full_name: "Ada Lovelace".to_string(),
                line1: "12 Analytical Way".to_string(),
                line2: None,
                city: "London".to_string(),
                state: "LDN".to_string(),
                postal_code: "N1 9GU".to_string(),
                country: "GB".to_string(),
                phone: Some("+44 20 0000 0000".to_string()),
            },
            payment_method: PaymentMethod::Card,
            payment_status: PaymentStatus::Paid,
            totals: OrderTotals::default(),
            status: OrderStatus::Shipped,
            shipment: ShipmentDetails {
                tracking_number: Some(TrackingNumber::parse("TRKABCDEF123456").unwrap()),
                ..ShipmentDetails::default()
            },
            events: vec![TrackingEvent::new(OrderStatus::Shipped, None, None, Utc::now())],
            version: 2,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_public_view_redacts_private_fields() {
        let json = serde_json::to_string(&TrackingResponse::public(&order())).unwrap();

        assert!(json.contains("TRKABCDEF123456"));
        assert!(json.contains("London"));
        assert!(!json.contains("customer_id"));
        assert!(!json.contains("Analytical Way"));
        assert!(!json.contains("Ada Lovelace"));
        assert!(!json.contains("payment"));
        assert!(!json.contains("unit_price"));
        assert!(!json.contains("total"));
    }

    #[test]
    fn test_item_count_does_not_wrap() {
        let mut order = order();
        let line = LineItem::try_from(NewLineItem {
            product_id: ProductId::new(2),
            name: "Sample Sachet".to_string(),
            quantity: u32::MAX,
            unit_price: Decimal::ZERO,
        })
        .unwrap();
        order.items = vec![line.clone(), line];

        let view = PublicOrderView::from(&order);
        assert_eq!(view.item_count, 2 * u64::from(u32::MAX));
    }

    #[test]
    fn test_full_view_keeps_everything() {
        let json = serde_json::to_value(TrackingResponse::full(order())).unwrap();
        assert_eq!(json["order"]["customer_id"], 77);
        assert_eq!(json["order"]["payment_method"], "CARD");
        assert_eq!(json["events"].as_array().unwrap().len(), 1);
        assert_eq!(json["timeline"]["display"]["kind"], "progress");
    }
}
