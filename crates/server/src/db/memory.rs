//! In-memory order store.
//!
//! Used by the test suites and `TRACKER_STORE=memory`. A single
//! `parking_lot::RwLock` guards the map, so a status change is atomic with
//! respect to every other operation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use order_tracker_core::{Order, OrderId, OrderStatus, ShipmentDetails, TrackingNumber, UserId};

use super::{NewOrder, OrderFilter, OrderStore, RepositoryError, StatusChange};

#[derive(Default)]
struct Inner {
    next_id: i32,
    orders: BTreeMap<OrderId, Order>,
}

/// Order store held in process memory.
#[derive(Default)]
pub struct InMemoryOrderStore {
    inner: RwLock<Inner>,
}

impl InMemoryOrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().orders.len()
    }

    /// Whether the store holds no orders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().orders.is_empty()
    }
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let id = OrderId::new(inner.next_id);

        let stored = Order {
            id,
            customer_id: order.customer_id,
            items: order.items,
            shipping_address: order.shipping_address,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            totals: order.totals,
            status: OrderStatus::Pending,
            shipment: ShipmentDetails::default(),
            events: Vec::new(),
            version: 1,
            created_at: order.created_at,
            updated_at: order.created_at,
        };
        inner.orders.insert(id, stored.clone());
        drop(inner);

        Ok(stored)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.inner.read().orders.get(&id).cloned())
    }

    async fn find_by_tracking_number(
        &self,
        tracking_number: &TrackingNumber,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .orders
            .values()
            .find(|order| order.shipment.tracking_number.as_ref() == Some(tracking_number))
            .cloned())
    }

    async fn list_for_customer(
        &self,
        customer_id: UserId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .inner
            .read()
            .orders
            .values()
            .filter(|order| order.customer_id == customer_id)
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(orders)
    }

    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .inner
            .read()
            .orders
            .values()
            .filter(|order| filter.status.is_none_or(|status| order.status == status))
            .cloned()
            .collect();
        newest_first(&mut orders);
        orders.truncate(filter.effective_limit() as usize);
        Ok(orders)
    }

    async fn apply_status_change(
        &self,
        id: OrderId,
        change: StatusChange,
    ) -> Result<Order, RepositoryError> {
        let mut inner = self.inner.write();

        if let Some(tracking_number) = &change.shipment.tracking_number {
            let taken = inner.orders.values().any(|other| {
                other.id != id && other.shipment.tracking_number.as_ref() == Some(tracking_number)
            });
            if taken {
                return Err(RepositoryError::Conflict(
                    "tracking number already in use".to_owned(),
                ));
            }
        }

        let order = inner.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if order.version != change.expected_version {
            return Err(RepositoryError::Conflict(format!(
                "order {id} is at version {}, expected {}",
                order.version, change.expected_version
            )));
        }

        order.status = change.status;
        order.events.push(change.event);
        order.shipment = change.shipment;
        order.payment_status = change.payment_status;
        order.version += 1;
        order.updated_at = Utc::now();

        Ok(order.clone())
    }

    async fn delete(&self, id: OrderId) -> Result<bool, RepositoryError> {
        Ok(self.inner.write().orders.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
