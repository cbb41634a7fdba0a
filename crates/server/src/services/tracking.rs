//! Order tracking service.
//!
//! Every write goes through [`TrackingService`]: it validates input, consults
//! the transition policy, and hands the store one [`StatusChange`] so the new
//! status, the appended event and the shipment details land together. The
//! caller's [`Principal`] is an explicit argument on every operation.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};
use url::Url;

use order_tracker_core::{
    AmountError, InvalidTransition, LineItem, MAX_AMOUNT, NewLineItem, Order, OrderId,
    OrderStatus, PaymentMethod, PaymentStatus, PricingPolicy, ShipmentDetails, ShippingAddress,
    TrackingEvent, TrackingNumber, TransitionPolicy, types::order::items_subtotal,
};

use crate::db::{NewOrder, OrderFilter, OrderStore, RepositoryError, StatusChange};
use crate::models::Principal;

/// Prefix of server-generated tracking numbers.
pub const TRACKING_NUMBER_PREFIX: &str = "TRK";
/// Random characters after the prefix.
pub const TRACKING_NUMBER_RANDOM_LEN: usize = 12;
const TRACKING_NUMBER_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Largest number of orders accepted by one bulk update.
pub const MAX_BULK_ORDERS: usize = 100;
const MAX_LINE_ITEMS: usize = 100;
/// Largest quantity accepted on one line item.
pub const MAX_ITEM_QUANTITY: u32 = 10_000;
const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_LOCATION_LEN: usize = 200;
const MAX_CARRIER_LEN: usize = 100;

/// Errors from tracking operations.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// No order with that id or tracking number is visible to the caller.
    #[error("order not found")]
    OrderNotFound,

    /// The state machine rejected the requested status.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// The request is well-formed but its content is not acceptable.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The order changed underneath the request, or a unique value is taken.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller lacks the role the operation needs.
    #[error("admin role required")]
    Forbidden,

    /// The store failed.
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for TrackingError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::OrderNotFound,
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Repository(other),
        }
    }
}

impl From<AmountError> for TrackingError {
    fn from(err: AmountError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// A status change requested for one order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub carrier: Option<String>,
    #[serde(default)]
    pub tracking_url: Option<String>,
    #[serde(default)]
    pub estimated_delivery: Option<DateTime<Utc>>,
}

/// The same status change applied to many orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkStatusUpdate {
    pub order_ids: Vec<OrderId>,
    pub status: OrderStatus,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// An order in a bulk update that could not be changed.
#[derive(Debug, Clone, Serialize)]
pub struct BulkFailure {
    pub order_id: OrderId,
    pub error: String,
}

/// Result of a bulk update. Successful orders stay updated even when
/// others fail.
#[derive(Debug, Default)]
pub struct BulkOutcome {
    pub updated: Vec<Order>,
    pub failures: Vec<BulkFailure>,
}

impl BulkOutcome {
    /// Whether every requested order was updated.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Checkout input for a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<NewLineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub discount: Option<Decimal>,
}

/// Order lifecycle operations over an [`OrderStore`].
#[derive(Clone)]
pub struct TrackingService {
    store: Arc<dyn OrderStore>,
    transitions: TransitionPolicy,
    pricing: PricingPolicy,
}

impl TrackingService {
    /// Create a tracking service.
    #[must_use]
    pub fn new(
        store: Arc<dyn OrderStore>,
        transitions: TransitionPolicy,
        pricing: PricingPolicy,
    ) -> Self {
        Self {
            store,
            transitions,
            pricing,
        }
    }

    /// The underlying order store.
    #[must_use]
    pub fn store(&self) -> &dyn OrderStore {
        self.store.as_ref()
    }

    /// Create an order for the calling customer.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::Validation` for empty carts, quantities outside
    /// `1..=MAX_ITEM_QUANTITY`, prices outside `0..=MAX_AMOUNT`, totals too
    /// large to store, or blank address fields.
    #[instrument(skip(self, request), fields(customer_id = %principal.user_id))]
    pub async fn create_order(
        &self,
        principal: &Principal,
        request: CheckoutRequest,
    ) -> Result<Order, TrackingError> {
        validate_items(&request.items)?;
        let shipping_address = normalize_address(request.shipping_address)?;

        let items = request
            .items
            .into_iter()
            .map(LineItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let totals = self.pricing.quote(
            items_subtotal(&items)?,
            request.discount.unwrap_or(Decimal::ZERO),
        )?;

        let order = self
            .store
            .insert(NewOrder {
                customer_id: principal.user_id,
                items,
                shipping_address,
                payment_method: request.payment_method,
                payment_status: request.payment_method.initial_payment_status(),
                totals,
                created_at: Utc::now(),
            })
            .await?;

        info!(order_id = %order.id, total = %order.totals.total, "Order created");
        Ok(order)
    }

    /// Move one order to a new status and record a tracking event.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::Forbidden` for non-admins,
    /// `TrackingError::OrderNotFound`, `TrackingError::Validation` for bad
    /// shipment details, `TrackingError::InvalidTransition` when the policy
    /// rejects the move, and `TrackingError::Conflict` when the order changed
    /// concurrently.
    #[instrument(skip(self, update), fields(admin_id = %principal.user_id, status = %update.status))]
    pub async fn update_status(
        &self,
        principal: &Principal,
        id: OrderId,
        update: StatusUpdate,
    ) -> Result<Order, TrackingError> {
        require_admin(principal)?;
        let shipment_update = parse_shipment(&update)?;
        let description = bounded_text(update.description, "description", MAX_DESCRIPTION_LEN)?;
        let location = bounded_text(update.location, "location", MAX_LOCATION_LEN)?;

        let order = self
            .store
            .get(id)
            .await?
            .ok_or(TrackingError::OrderNotFound)?;

        let change = self.plan_change(
            &order,
            update.status,
            &shipment_update,
            description.as_deref(),
            location.as_deref(),
        )?;
        let updated = self.store.apply_status_change(id, change).await?;

        info!(
            order_id = %id,
            from = %order.status,
            to = %updated.status,
            "Order status updated"
        );
        Ok(updated)
    }

    /// Apply one status to many orders.
    ///
    /// Orders are processed independently; a failure on one does not roll
    /// back the others.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::Forbidden` for non-admins and
    /// `TrackingError::Validation` for an empty or oversized batch. Per-order
    /// failures are reported in the outcome instead.
    #[instrument(skip(self, update), fields(admin_id = %principal.user_id, status = %update.status, count = update.order_ids.len()))]
    pub async fn bulk_update(
        &self,
        principal: &Principal,
        update: BulkStatusUpdate,
    ) -> Result<BulkOutcome, TrackingError> {
        require_admin(principal)?;

        if update.order_ids.is_empty() {
            return Err(TrackingError::Validation(
                "order_ids must not be empty".to_string(),
            ));
        }
        if update.order_ids.len() > MAX_BULK_ORDERS {
            return Err(TrackingError::Validation(format!(
                "at most {MAX_BULK_ORDERS} orders per bulk update"
            )));
        }

        let mut seen = HashSet::new();
        let mut outcome = BulkOutcome::default();

        for id in update.order_ids {
            if !seen.insert(id) {
                continue;
            }

            let single = StatusUpdate {
                status: update.status,
                description: update.description.clone(),
                location: update.location.clone(),
                ..StatusUpdate::default()
            };

            match self.update_status(principal, id, single).await {
                Ok(order) => outcome.updated.push(order),
                Err(e @ TrackingError::Repository(_)) => {
                    warn!(order_id = %id, error = %e, "Bulk update store failure");
                    outcome.failures.push(BulkFailure {
                        order_id: id,
                        error: "internal error".to_string(),
                    });
                }
                Err(e) => outcome.failures.push(BulkFailure {
                    order_id: id,
                    error: e.to_string(),
                }),
            }
        }

        if !outcome.is_complete() {
            warn!(
                success = outcome.updated.len(),
                errors = ?outcome.failures,
                "Bulk status update had errors"
            );
        }

        Ok(outcome)
    }

    /// Fetch an order the caller may read.
    ///
    /// Orders belonging to someone else are reported as not found.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::OrderNotFound` when the order is missing or not visible.
    #[instrument(skip(self), fields(user_id = %principal.user_id))]
    pub async fn order_for(
        &self,
        principal: &Principal,
        id: OrderId,
    ) -> Result<Order, TrackingError> {
        self.store
            .get(id)
            .await?
            .filter(|order| principal.can_read(order))
            .ok_or(TrackingError::OrderNotFound)
    }

    /// Look up an order by tracking number without authentication.
    ///
    /// Malformed tracking numbers are treated like unknown ones.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::OrderNotFound` when nothing matches.
    #[instrument(skip(self, tracking_number))]
    pub async fn public_lookup(&self, tracking_number: &str) -> Result<Order, TrackingError> {
        let Ok(tracking_number) = TrackingNumber::parse(tracking_number) else {
            return Err(TrackingError::OrderNotFound);
        };

        self.store
            .find_by_tracking_number(&tracking_number)
            .await?
            .ok_or(TrackingError::OrderNotFound)
    }

    /// The caller's own orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::Repository` if the store fails.
    pub async fn orders_for(&self, principal: &Principal) -> Result<Vec<Order>, TrackingError> {
        Ok(self.store.list_for_customer(principal.user_id).await?)
    }

    /// Every order matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::Forbidden` for non-admins.
    pub async fn list_orders(
        &self,
        principal: &Principal,
        filter: OrderFilter,
    ) -> Result<Vec<Order>, TrackingError> {
        require_admin(principal)?;
        Ok(self.store.list(filter).await?)
    }

    /// Hard delete an order. This is not a status transition.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::Forbidden` for non-admins and
    /// `TrackingError::OrderNotFound` when nothing was deleted.
    #[instrument(skip(self), fields(admin_id = %principal.user_id))]
    pub async fn delete_order(
        &self,
        principal: &Principal,
        id: OrderId,
    ) -> Result<(), TrackingError> {
        require_admin(principal)?;
        if self.store.delete(id).await? {
            warn!(order_id = %id, "Order deleted");
            Ok(())
        } else {
            Err(TrackingError::OrderNotFound)
        }
    }

    fn plan_change(
        &self,
        order: &Order,
        requested: OrderStatus,
        shipment_update: &ShipmentDetails,
        description: Option<&str>,
        location: Option<&str>,
    ) -> Result<StatusChange, TrackingError> {
        let status = self.transitions.apply(order.status, requested)?;

        let mut shipment = order.shipment.merged_with(shipment_update);
        if status == OrderStatus::Shipped && shipment.tracking_number.is_none() {
            shipment.tracking_number = Some(generate_tracking_number()?);
        }

        let payment_status = match status {
            OrderStatus::Refunded => PaymentStatus::Refunded,
            OrderStatus::Delivered if order.payment_method == PaymentMethod::CashOnDelivery => {
                PaymentStatus::Paid
            }
            _ => order.payment_status,
        };

        Ok(StatusChange {
            expected_version: order.version,
            status,
            event: TrackingEvent::new(status, description, location, Utc::now()),
            shipment,
            payment_status,
        })
    }
}

fn require_admin(principal: &Principal) -> Result<(), TrackingError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(TrackingError::Forbidden)
    }
}

/// Generate a `TRK` tracking number with 12 random uppercase alphanumerics.
///
/// # Errors
///
/// Returns `TrackingError::Validation` only if the generated value fails to parse.
pub fn generate_tracking_number() -> Result<TrackingNumber, TrackingError> {
    let mut rng = rand::rng();
    let suffix: String = (0..TRACKING_NUMBER_RANDOM_LEN)
        .filter_map(|_| TRACKING_NUMBER_ALPHABET.choose(&mut rng).copied())
        .map(char::from)
        .collect();

    TrackingNumber::parse(&format!("{TRACKING_NUMBER_PREFIX}{suffix}"))
        .map_err(|e| TrackingError::Validation(e.to_string()))
}

fn parse_shipment(update: &StatusUpdate) -> Result<ShipmentDetails, TrackingError> {
    let tracking_number = update
        .tracking_number
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(TrackingNumber::parse)
        .transpose()
        .map_err(|e| TrackingError::Validation(e.to_string()))?;

    let carrier = bounded_text(update.carrier.clone(), "carrier", MAX_CARRIER_LEN)?;

    let tracking_url = update
        .tracking_url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(validate_tracking_url)
        .transpose()?;

    Ok(ShipmentDetails {
        tracking_number,
        carrier,
        tracking_url,
        estimated_delivery: update.estimated_delivery,
    })
}

fn validate_tracking_url(raw: &str) -> Result<String, TrackingError> {
    let url = Url::parse(raw)
        .map_err(|e| TrackingError::Validation(format!("tracking_url: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(TrackingError::Validation(
            "tracking_url must use http or https".to_string(),
        ));
    }
    Ok(url.to_string())
}

/// Trim optional free text; blank becomes `None`, overlong is rejected.
fn bounded_text(
    value: Option<String>,
    field: &str,
    max: usize,
) -> Result<Option<String>, TrackingError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > max {
        return Err(TrackingError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

fn validate_items(items: &[NewLineItem]) -> Result<(), TrackingError> {
    if items.is_empty() {
        return Err(TrackingError::Validation(
            "order must contain at least one item".to_string(),
        ));
    }
    if items.len() > MAX_LINE_ITEMS {
        return Err(TrackingError::Validation(format!(
            "order may contain at most {MAX_LINE_ITEMS} items"
        )));
    }

    for item in items {
        if item.name.trim().is_empty() {
            return Err(TrackingError::Validation(
                "item name must not be empty".to_string(),
            ));
        }
        if !(1..=MAX_ITEM_QUANTITY).contains(&item.quantity) {
            return Err(TrackingError::Validation(format!(
                "quantity for '{}' must be between 1 and {MAX_ITEM_QUANTITY}",
                item.name
            )));
        }
        if item.unit_price.is_sign_negative() {
            return Err(TrackingError::Validation(format!(
                "unit price for '{}' must not be negative",
                item.name
            )));
        }
        if item.unit_price > MAX_AMOUNT {
            return Err(TrackingError::Validation(format!(
                "unit price for '{}' exceeds the maximum of {MAX_AMOUNT}",
                item.name
            )));
        }
    }

    Ok(())
}

fn normalize_address(address: ShippingAddress) -> Result<ShippingAddress, TrackingError> {
    fn required(value: String, field: &str) -> Result<String, TrackingError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(TrackingError::Validation(format!(
                "shipping_address.{field} must not be empty"
            )));
        }
        Ok(trimmed.to_string())
    }

    fn optional(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    Ok(ShippingAddress {
        full_name: required(address.full_name, "full_name")?,
        line1: required(address.line1, "line1")?,
        line2: optional(address.line2),
        city: required(address.city, "city")?,
        state: required(address.state, "state")?,
        postal_code: required(address.postal_code, "postal_code")?,
        country: required(address.country, "country")?,
        phone: optional(address.phone),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use order_tracker_core::{ProductId, Role, UserId};

    use super::*;
    use crate::db::InMemoryOrderStore;

    fn service(policy: TransitionPolicy) -> TrackingService {
        TrackingService::new(
            Arc::new(InMemoryOrderStore::new()),
            policy,
            PricingPolicy::default(),
        )
    }

    fn admin() -> Principal {
        Principal::new(UserId::new(1), Role::Admin)
    }

    fn customer(id: i32) -> Principal {
        Principal::new(UserId::new(id), Role::Customer)
    }

    fn checkout(payment_method: PaymentMethod) -> CheckoutRequest {
        CheckoutRequest {
            items: vec![NewLineItem {
                product_id: ProductId::new(7),
                name: "Dried Mango Slices".to_string(),
                quantity: 2,
                unit_price: Decimal::new(1000, 2),
            }],
            shipping_address: ShippingAddress {
                full_name: " Grace Hopper ".to_string(),
                line1: "1 Compiler Ct".to_string(),
                line2: Some("  ".to_string()),
                city: "Arlington".to_string(),
                state: "VA".to_string(),
                postal_code: "22201".to_string(),
                country: "US".to_string(),
                phone: None,
            },
            payment_method,
            discount: None,
        }
    }

    fn to(status: OrderStatus) -> StatusUpdate {
        StatusUpdate {
            status,
            ..StatusUpdate::default()
        }
    }

    async fn placed(svc: &TrackingService, owner: i32) -> Order {
        svc.create_order(&customer(owner), checkout(PaymentMethod::Card))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_order_prices_and_normalizes() {
        let svc = service(TransitionPolicy::Enforced);
        let order = placed(&svc, 5).await;

        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.events.is_empty());
        assert_eq!(order.customer_id, UserId::new(5));
        assert_eq!(order.totals.subtotal, Decimal::new(2000, 2));
        assert_eq!(order.totals.shipping, Decimal::new(599, 2));
        assert!(order.totals.is_consistent());
        assert_eq!(order.shipping_address.full_name, "Grace Hopper");
        assert_eq!(order.shipping_address.line2, None);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_create_order_rejects_empty_cart() {
        let svc = service(TransitionPolicy::Enforced);
        let mut request = checkout(PaymentMethod::Card);
        request.items.clear();
        let result = svc.create_order(&customer(5), request).await;
        assert!(matches!(result, Err(TrackingError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_order_rejects_zero_quantity() {
        let svc = service(TransitionPolicy::Enforced);
        let mut request = checkout(PaymentMethod::Card);
        request.items[0].quantity = 0;
        let result = svc.create_order(&customer(5), request).await;
        assert!(matches!(result, Err(TrackingError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_order_rejects_quantity_over_cap() {
        let svc = service(TransitionPolicy::Enforced);
        let mut request = checkout(PaymentMethod::Card);
        request.items[0].quantity = MAX_ITEM_QUANTITY + 1;
        let result = svc.create_order(&customer(5), request).await;
        assert!(matches!(result, Err(TrackingError::Validation(_))));

        let mut request = checkout(PaymentMethod::Card);
        request.items[0].quantity = MAX_ITEM_QUANTITY;
        let order = svc.create_order(&customer(5), request).await.unwrap();
        assert_eq!(order.item_count(), u64::from(MAX_ITEM_QUANTITY));
    }

    #[tokio::test]
    async fn test_create_order_rejects_amounts_too_large_to_store() {
        let svc = service(TransitionPolicy::Enforced);

        let mut request = checkout(PaymentMethod::Card);
        request.items[0].quantity = 100_000;
        request.items[0].unit_price = Decimal::from_i128_with_scale(10_i128.pow(25), 0);
        let result = svc.create_order(&customer(5), request).await;
        assert!(matches!(result, Err(TrackingError::Validation(_))));

        // Each line fits but the cart subtotal does not
        let mut request = checkout(PaymentMethod::Card);
        request.items[0].quantity = 1;
        request.items[0].unit_price = MAX_AMOUNT;
        request.items.push(request.items[0].clone());
        let result = svc.create_order(&customer(5), request).await;
        match result {
            Err(TrackingError::Validation(msg)) => {
                assert_eq!(msg, "validation failed: subtotal exceeds the maximum of 9999999999.99");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(svc.store().list(OrderFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_records_default_description() {
        let svc = service(TransitionPolicy::Enforced);
        let order = placed(&svc, 5).await;

        let updated = svc
            .update_status(&admin(), order.id, to(OrderStatus::Confirmed))
            .await
            .unwrap();

        assert_eq!(updated.status, OrderStatus::Confirmed);
        assert_eq!(updated.events.len(), 1);
        assert_eq!(updated.events[0].description, "Order confirmed");
        assert_eq!(updated.events[0].status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_skip_to_delivered_allowed() {
        let svc = service(TransitionPolicy::Enforced);
        let order = placed(&svc, 5).await;
        let updated = svc
            .update_status(&admin(), order.id, to(OrderStatus::Delivered))
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_backward_move_rejected_unless_permissive() {
        let svc = service(TransitionPolicy::Enforced);
        let order = placed(&svc, 5).await;
        svc.update_status(&admin(), order.id, to(OrderStatus::Delivered))
            .await
            .unwrap();

        let result = svc
            .update_status(&admin(), order.id, to(OrderStatus::Pending))
            .await;
        assert!(matches!(result, Err(TrackingError::InvalidTransition(_))));
        let stored = svc.order_for(&admin(), order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Delivered);
        assert_eq!(stored.events.len(), 1);

        let svc = service(TransitionPolicy::Permissive);
        let order = placed(&svc, 5).await;
        svc.update_status(&admin(), order.id, to(OrderStatus::Delivered))
            .await
            .unwrap();
        let updated = svc
            .update_status(&admin(), order.id, to(OrderStatus::Pending))
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_concurrent_same_status_updates_conflict() {
        let svc = service(TransitionPolicy::Enforced);
        let order = placed(&svc, 5).await;
        let shipped = svc
            .update_status(&admin(), order.id, to(OrderStatus::Shipped))
            .await
            .unwrap();

        // Both admins read the shipped order before either writes
        let ups = ShipmentDetails {
            carrier: Some("UPS".to_string()),
            ..ShipmentDetails::default()
        };
        let dhl = ShipmentDetails {
            carrier: Some("DHL".to_string()),
            ..ShipmentDetails::default()
        };
        let first = svc
            .plan_change(&shipped, OrderStatus::Shipped, &ups, None, None)
            .unwrap();
        let second = svc
            .plan_change(&shipped, OrderStatus::Shipped, &dhl, None, None)
            .unwrap();

        svc.store().apply_status_change(order.id, first).await.unwrap();
        let result: Result<Order, TrackingError> = svc
            .store()
            .apply_status_change(order.id, second)
            .await
            .map_err(TrackingError::from);
        assert!(matches!(result, Err(TrackingError::Conflict(_))));

        let stored = svc.order_for(&admin(), order.id).await.unwrap();
        assert_eq!(stored.shipment.carrier.as_deref(), Some("UPS"));
        assert_eq!(stored.events.len(), 2);
        assert_eq!(stored.version, shipped.version + 1);
    }

    #[tokio::test]
    async fn test_customer_cannot_update_status() {
        let svc = service(TransitionPolicy::Enforced);
        let order = placed(&svc, 5).await;
        let result = svc
            .update_status(&customer(5), order.id, to(OrderStatus::Confirmed))
            .await;
        assert!(matches!(result, Err(TrackingError::Forbidden)));
    }

    #[tokio::test]
    async fn test_shipping_generates_tracking_number() {
        let svc = service(TransitionPolicy::Enforced);
        let order = placed(&svc, 5).await;
        let updated = svc
            .update_status(&admin(), order.id, to(OrderStatus::Shipped))
            .await
            .unwrap();

        let tracking_number = updated.shipment.tracking_number.unwrap();
        assert!(tracking_number.as_str().starts_with("TRK"));
        assert_eq!(tracking_number.as_str().len(), 15);

        let found = svc.public_lookup(tracking_number.as_str()).await.unwrap();
        assert_eq!(found.id, order.id);
    }

    #[tokio::test]
    async fn test_supplied_shipment_details_are_kept() {
        let svc = service(TransitionPolicy::Enforced);
        let order = placed(&svc, 5).await;
        let update = StatusUpdate {
            status: OrderStatus::Shipped,
            tracking_number: Some("1z999aa10123456784".to_string()),
            carrier: Some("UPS".to_string()),
            tracking_url: Some("https://www.ups.com/track?tracknum=1Z999AA10123456784".to_string()),
            location: Some("Memphis, TN".to_string()),
            ..StatusUpdate::default()
        };

        let updated = svc.update_status(&admin(), order.id, update).await.unwrap();
        assert_eq!(
            updated.shipment.tracking_number.unwrap().as_str(),
            "1Z999AA10123456784"
        );
        assert_eq!(updated.shipment.carrier.as_deref(), Some("UPS"));
        assert_eq!(updated.events[0].location.as_deref(), Some("Memphis, TN"));
    }

    #[tokio::test]
    async fn test_non_http_tracking_url_rejected() {
        let svc = service(TransitionPolicy::Enforced);
        let order = placed(&svc, 5).await;
        let update = StatusUpdate {
            status: OrderStatus::Shipped,
            tracking_url: Some("javascript:alert(1)".to_string()),
            ..StatusUpdate::default()
        };
        let result = svc.update_status(&admin(), order.id, update).await;
        assert!(matches!(result, Err(TrackingError::Validation(_))));
    }

    #[tokio::test]
    async fn test_refund_marks_payment_refunded() {
        let svc = service(TransitionPolicy::Enforced);
        let order = placed(&svc, 5).await;
        let updated = svc
            .update_status(&admin(), order.id, to(OrderStatus::Refunded))
            .await
            .unwrap();
        assert_eq!(updated.payment_status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn test_cash_on_delivery_paid_on_delivery() {
        let svc = service(TransitionPolicy::Enforced);
        let order = svc
            .create_order(&customer(5), checkout(PaymentMethod::CashOnDelivery))
            .await
            .unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Pending);

        let updated = svc
            .update_status(&admin(), order.id, to(OrderStatus::Delivered))
            .await
            .unwrap();
        assert_eq!(updated.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_bulk_update_partial_success() {
        let svc = service(TransitionPolicy::Enforced);
        let order = placed(&svc, 5).await;
        let missing = OrderId::new(9999);

        let outcome = svc
            .bulk_update(
                &admin(),
                BulkStatusUpdate {
                    order_ids: vec![order.id, missing, order.id],
                    status: OrderStatus::Processing,
                    description: None,
                    location: None,
                },
            )
            .await
            .unwrap();

        assert!(!outcome.is_complete());
        assert_eq!(outcome.updated.len(), 1);
        assert_eq!(outcome.updated[0].status, OrderStatus::Processing);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].order_id, missing);
        assert_eq!(outcome.failures[0].error, "order not found");
    }

    #[tokio::test]
    async fn test_bulk_update_rejects_empty_batch() {
        let svc = service(TransitionPolicy::Enforced);
        let result = svc
            .bulk_update(
                &admin(),
                BulkStatusUpdate {
                    order_ids: Vec::new(),
                    status: OrderStatus::Processing,
                    description: None,
                    location: None,
                },
            )
            .await;
        assert!(matches!(result, Err(TrackingError::Validation(_))));
    }

    #[tokio::test]
    async fn test_other_customers_order_is_not_found() {
        let svc = service(TransitionPolicy::Enforced);
        let order = placed(&svc, 5).await;

        assert!(svc.order_for(&customer(5), order.id).await.is_ok());
        assert!(svc.order_for(&admin(), order.id).await.is_ok());
        assert!(matches!(
            svc.order_for(&customer(6), order.id).await,
            Err(TrackingError::OrderNotFound)
        ));
    }

    #[tokio::test]
    async fn test_public_lookup_unknown_and_malformed() {
        let svc = service(TransitionPolicy::Enforced);
        assert!(matches!(
            svc.public_lookup("TRKNOSUCHNUMBER").await,
            Err(TrackingError::OrderNotFound)
        ));
        assert!(matches!(
            svc.public_lookup("../etc/passwd").await,
            Err(TrackingError::OrderNotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_order() {
        let svc = service(TransitionPolicy::Enforced);
        let order = placed(&svc, 5).await;
        assert!(matches!(
            svc.delete_order(&customer(5), order.id).await,
            Err(TrackingError::Forbidden)
        ));
        svc.delete_order(&admin(), order.id).await.unwrap();
        assert!(matches!(
            svc.delete_order(&admin(), order.id).await,
            Err(TrackingError::OrderNotFound)
        ));
    }

    #[test]
    fn test_generated_tracking_numbers_are_well_formed() {
        for _ in 0..50 {
            let tn = generate_tracking_number().unwrap();
            let suffix = tn.as_str().strip_prefix("TRK").unwrap();
            assert_eq!(suffix.len(), 12);
            assert!(
                suffix
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            );
        }
    }
}
