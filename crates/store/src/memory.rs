use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    Address, AddressId, NewAddress, NewOrder, Order, OrderId, OrderStatus, ProductId, Result,
    StoreError, UserId,
    store::{AddressStore, OrderStore},
};

#[derive(Debug, Default)]
struct Failures {
    create_address: bool,
    delete_address: bool,
    create_order: bool,
    delete_order: bool,
    update_status: bool,
}

#[derive(Debug, Default)]
struct State {
    addresses: BTreeMap<AddressId, Address>,
    orders: BTreeMap<OrderId, Order>,
    last_address_id: i64,
    last_order_id: i64,
    fail: Failures,
}

/// In-memory order store.
///
/// Ids are assigned sequentially from 1, mirroring `BIGSERIAL` columns.
/// Each write can be made to fail on demand so saga compensation paths can
/// be exercised without a database.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored addresses.
    pub async fn address_count(&self) -> usize {
        self.state.read().await.addresses.len()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns every stored order, ordered by id.
    pub async fn all_orders(&self) -> Vec<Order> {
        self.state.read().await.orders.values().cloned().collect()
    }

    /// Configures `create_address` to fail.
    pub async fn set_fail_on_create_address(&self, fail: bool) {
        self.state.write().await.fail.create_address = fail;
    }

    /// Configures `delete_address` to fail.
    pub async fn set_fail_on_delete_address(&self, fail: bool) {
        self.state.write().await.fail.delete_address = fail;
    }

    /// Configures `create_order` to fail.
    pub async fn set_fail_on_create_order(&self, fail: bool) {
        self.state.write().await.fail.create_order = fail;
    }

    /// Configures `delete_order` to fail.
    pub async fn set_fail_on_delete_order(&self, fail: bool) {
        self.state.write().await.fail.delete_order = fail;
    }

    /// Configures `update_status` and `transition_status` to fail.
    pub async fn set_fail_on_update_status(&self, fail: bool) {
        self.state.write().await.fail.update_status = fail;
    }

    /// Removes all rows and resets the id sequences.
    pub async fn clear(&self) {
        *self.state.write().await = State::default();
    }

    fn refuse(operation: &str) -> StoreError {
        StoreError::Unavailable(format!("{operation} disabled"))
    }
}

#[async_trait]
impl AddressStore for InMemoryStore {
    async fn create_address(&self, address: NewAddress) -> Result<Address> {
        let mut state = self.state.write().await;
        if state.fail.create_address {
            return Err(Self::refuse("create_address"));
        }

        state.last_address_id += 1;
        let address = Address {
            id: AddressId::new(state.last_address_id),
            name: address.name,
            phone: address.phone,
            detail: address.detail,
        };
        state.addresses.insert(address.id, address.clone());
        Ok(address)
    }

    async fn delete_address(&self, id: AddressId) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail.delete_address {
            return Err(Self::refuse("delete_address"));
        }

        state
            .addresses
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::AddressNotFound(id))
    }

    async fn get_address(&self, id: AddressId) -> Result<Address> {
        self.state
            .read()
            .await
            .addresses
            .get(&id)
            .cloned()
            .ok_or(StoreError::AddressNotFound(id))
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let mut state = self.state.write().await;
        if state.fail.create_order {
            return Err(Self::refuse("create_order"));
        }

        state.last_order_id += 1;
        let order = Order {
            id: OrderId::new(state.last_order_id),
            customer_id: order.customer_id,
            supplier_id: order.supplier_id,
            product_id: order.product_id,
            quantity: order.quantity,
            address_id: order.address_id,
            status: OrderStatus::Waiting,
            created_at: Utc::now(),
        };
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn delete_order(&self, id: OrderId) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail.delete_order {
            return Err(Self::refuse("delete_order"));
        }

        state
            .orders
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::OrderNotFound(id))
    }

    async fn get_order(&self, id: OrderId) -> Result<Order> {
        self.state
            .read()
            .await
            .orders
            .get(&id)
            .cloned()
            .ok_or(StoreError::OrderNotFound(id))
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail.update_status {
            return Err(Self::refuse("update_status"));
        }

        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;
        order.status = status;
        Ok(())
    }

    async fn transition_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order> {
        let mut state = self.state.write().await;
        if state.fail.update_status {
            return Err(Self::refuse("transition_status"));
        }

        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;
        if order.status != from {
            return Err(StoreError::StatusConflict {
                id,
                expected: from,
                actual: order.status,
            });
        }
        order.status = to;
        Ok(order.clone())
    }

    async fn orders_by_customer(
        &self,
        customer: UserId,
        status: OrderStatus,
    ) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .filter(|o| o.customer_id == customer && o.status == status)
            .cloned()
            .collect())
    }

    async fn orders_by_supplier(
        &self,
        supplier: UserId,
        status: OrderStatus,
    ) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .filter(|o| o.supplier_id == supplier && o.status == status)
            .cloned()
            .collect())
    }

    async fn handled_quantities(&self, product: ProductId) -> Result<Vec<i32>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .filter(|o| o.product_id == product && o.status == OrderStatus::Handled)
            .map(|o| o.quantity)
            .collect())
    }

    async fn count_handled(&self, customer: UserId, product: ProductId) -> Result<i64> {
        let state = self.state.read().await;
        let count = state
            .orders
            .values()
            .filter(|o| {
                o.customer_id == customer
                    && o.product_id == product
                    && o.status == OrderStatus::Handled
            })
            .count();
        Ok(count as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_address() -> NewAddress {
        NewAddress {
            name: "Ada".to_string(),
            phone: "555-0100".to_string(),
            detail: "1 Analytical Way".to_string(),
        }
    }

    fn new_order(customer: i64, product: i64, quantity: i32) -> NewOrder {
        NewOrder {
            customer_id: UserId::new(customer),
            supplier_id: UserId::new(100),
            product_id: ProductId::new(product),
            quantity,
            address_id: AddressId::new(1),
        }
    }

    #[tokio::test]
    async fn test_address_lifecycle() {
        let store = InMemoryStore::new();

        let address = store.create_address(new_address()).await.unwrap();
        assert_eq!(address.id, AddressId::new(1));
        assert_eq!(store.get_address(address.id).await.unwrap(), address);

        store.delete_address(address.id).await.unwrap();
        assert!(matches!(
            store.get_address(address.id).await,
            Err(StoreError::AddressNotFound(_))
        ));
        assert!(
            store
                .delete_address(address.id)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let store = InMemoryStore::new();

        let first = store.create_order(new_order(1, 1, 1)).await.unwrap();
        let second = store.create_order(new_order(1, 1, 1)).await.unwrap();
        store.delete_order(second.id).await.unwrap();
        let third = store.create_order(new_order(1, 1, 1)).await.unwrap();

        assert_eq!(first.id, OrderId::new(1));
        assert_eq!(third.id, OrderId::new(3));
        assert_eq!(first.status, OrderStatus::Waiting);
    }

    #[tokio::test]
    async fn test_update_status_and_listings() {
        let store = InMemoryStore::new();
        let a = store.create_order(new_order(1, 10, 2)).await.unwrap();
        let b = store.create_order(new_order(1, 10, 3)).await.unwrap();
        let c = store.create_order(new_order(2, 10, 5)).await.unwrap();

        store.update_status(a.id, OrderStatus::Handled).await.unwrap();
        store.update_status(c.id, OrderStatus::Handled).await.unwrap();

        let waiting = store
            .orders_by_customer(UserId::new(1), OrderStatus::Waiting)
            .await
            .unwrap();
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].id, b.id);

        let handled = store
            .orders_by_supplier(UserId::new(100), OrderStatus::Handled)
            .await
            .unwrap();
        assert_eq!(
            handled.iter().map(|o| o.id).collect::<Vec<_>>(),
            [a.id, c.id]
        );

        let mut quantities = store.handled_quantities(ProductId::new(10)).await.unwrap();
        quantities.sort();
        assert_eq!(quantities, [2, 5]);

        assert_eq!(
            store
                .count_handled(UserId::new(1), ProductId::new(10))
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            store
                .count_handled(UserId::new(3), ProductId::new(10))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_update_missing_order() {
        let store = InMemoryStore::new();
        let result = store
            .update_status(OrderId::new(9), OrderStatus::Handled)
            .await;
        assert!(matches!(result, Err(StoreError::OrderNotFound(id)) if id == OrderId::new(9)));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = InMemoryStore::new();
        store.set_fail_on_create_order(true).await;

        let result = store.create_order(new_order(1, 1, 1)).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(store.order_count().await, 0);

        store.set_fail_on_create_order(false).await;
        let order = store.create_order(new_order(1, 1, 1)).await.unwrap();

        store.set_fail_on_delete_order(true).await;
        assert!(store.delete_order(order.id).await.is_err());
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_clear_resets_sequences() {
        let store = InMemoryStore::new();
        store.create_address(new_address()).await.unwrap();
        store.clear().await;

        assert_eq!(store.address_count().await, 0);
        let address = store.create_address(new_address()).await.unwrap();
        assert_eq!(address.id, AddressId::new(1));
    }

    #[tokio::test]
    async fn test_transition_requires_expected_status() {
        let store = InMemoryStore::new();
        let order = store.create_order(new_order(1, 1, 1)).await.unwrap();

        let handled = store
            .transition_status(order.id, OrderStatus::Waiting, OrderStatus::Handled)
            .await
            .unwrap();
        assert_eq!(handled.status, OrderStatus::Handled);

        let err = store
            .transition_status(order.id, OrderStatus::Waiting, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::StatusConflict {
                expected: OrderStatus::Waiting,
                actual: OrderStatus::Handled,
                ..
            }
        ));
        assert_eq!(
            store.get_order(order.id).await.unwrap().status,
            OrderStatus::Handled
        );
        assert!(
            store
                .transition_status(OrderId::new(9), OrderStatus::Waiting, OrderStatus::Handled)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_concurrent_transitions_have_one_winner() {
        let store = InMemoryStore::new();
        let order = store.create_order(new_order(1, 1, 1)).await.unwrap();

        let (a, b) = tokio::join!(
            store.transition_status(order.id, OrderStatus::Waiting, OrderStatus::Cancelled),
            store.transition_status(order.id, OrderStatus::Waiting, OrderStatus::Handled),
        );

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    }
}
