//! Demo data for local development.
//!
//! Inserts one checkout order through the same service the API uses, then
//! optionally walks it along the happy path so the timeline has history.

use std::sync::Arc;

use order_tracker_core::{
    NewLineItem, OrderStatus, PaymentMethod, ProductId, Role, ShippingAddress, UserId,
};
use order_tracker_server::config::TrackerConfig;
use order_tracker_server::db::{self, PgOrderStore};
use order_tracker_server::models::Principal;
use order_tracker_server::services::{CheckoutRequest, StatusUpdate, TrackingService};
use rust_decimal::Decimal;
use tracing::info;

use super::{CommandError, database_url};

/// Acts on behalf of the CLI operator.
const OPERATOR: Principal = Principal::new(UserId::new(0), Role::Admin);

/// Create a demo order for `customer` and advance it to `target`.
///
/// Happy-path targets pass through every intermediate status; cancelled,
/// returned, and refunded are applied directly from pending.
///
/// # Errors
///
/// Returns an error if configuration is missing, the database is unreachable,
/// or a transition is rejected.
pub async fn demo_order(customer: UserId, target: OrderStatus) -> Result<(), CommandError> {
    let config = TrackerConfig::from_env()?;
    let pool = db::create_pool(&database_url()?).await?;
    let service = TrackingService::new(
        Arc::new(PgOrderStore::new(pool)),
        config.transition_policy,
        config.pricing,
    );

    let order = service
        .create_order(&Principal::new(customer, Role::Customer), demo_checkout())
        .await?;
    info!(order_id = %order.id, customer_id = %customer, total = %order.totals.total, "Created demo order");

    let steps: Vec<OrderStatus> = match target.happy_path_index() {
        Some(index) => OrderStatus::HAPPY_PATH
            .iter()
            .take(index + 1)
            .skip(1)
            .copied()
            .collect(),
        None => vec![target],
    };

    let mut current = order;
    for status in steps {
        current = service
            .update_status(
                &OPERATOR,
                current.id,
                StatusUpdate {
                    status,
                    carrier: (status == OrderStatus::Shipped).then(|| "Demo Freight".to_string()),
                    ..StatusUpdate::default()
                },
            )
            .await?;
        info!(order_id = %current.id, status = %current.status, "Advanced demo order");
    }

    match &current.shipment.tracking_number {
        Some(tracking_number) => info!(
            order_id = %current.id,
            tracking_number = %tracking_number,
            "Demo order ready"
        ),
        None => info!(order_id = %current.id, status = %current.status, "Demo order ready"),
    }
    Ok(())
}

fn demo_checkout() -> CheckoutRequest {
    CheckoutRequest {
        items: vec![
            NewLineItem {
                product_id: ProductId::new(101),
                name: "Canvas Tote".to_string(),
                quantity: 2,
                unit_price: Decimal::new(1800, 2),
            },
            NewLineItem {
                product_id: ProductId::new(205),
                name: "Enamel Mug".to_string(),
                quantity: 1,
                unit_price: Decimal::new(1250, 2),
            },
        ],
        shipping_address: ShippingAddress {
            full_name: "Grace Hopper".to_string(),
            line1: "1 Compiler Court".to_string(),
            line2: None,
            city: "Arlington".to_string(),
            state: "VA".to_string(),
            postal_code: "22201".to_string(),
            country: "US".to_string(),
            phone: None,
        },
        payment_method: PaymentMethod::Card,
        discount: None,
    }
}
