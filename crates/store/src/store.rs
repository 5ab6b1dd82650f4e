use async_trait::async_trait;

use crate::{
    Address, AddressId, NewAddress, NewOrder, Order, OrderId, OrderStatus, ProductId, Result,
    UserId,
};

/// Persistence for shipping addresses.
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Inserts an address and returns it with its assigned id.
    async fn create_address(&self, address: NewAddress) -> Result<Address>;

    /// Deletes an address.
    ///
    /// Fails with `AddressNotFound` if the row does not exist.
    async fn delete_address(&self, id: AddressId) -> Result<()>;

    /// Loads an address by id.
    async fn get_address(&self, id: AddressId) -> Result<Address>;
}

/// Persistence for order rows.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts an order in the `Waiting` status.
    async fn create_order(&self, order: NewOrder) -> Result<Order>;

    /// Deletes an order.
    ///
    /// Fails with `OrderNotFound` if the row does not exist.
    async fn delete_order(&self, id: OrderId) -> Result<()>;

    /// Loads an order by id.
    async fn get_order(&self, id: OrderId) -> Result<Order>;

    /// Overwrites the status of an order.
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()>;

    /// Moves an order from `from` to `to` and returns the updated row.
    ///
    /// The check and the write are atomic: of two concurrent transitions out
    /// of the same status only one wins. Fails with `StatusConflict` if the
    /// order is not in `from`.
    async fn transition_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order>;

    /// Lists a customer's orders in the given status, oldest first.
    async fn orders_by_customer(&self, customer: UserId, status: OrderStatus)
    -> Result<Vec<Order>>;

    /// Lists a supplier's orders in the given status, oldest first.
    async fn orders_by_supplier(&self, supplier: UserId, status: OrderStatus)
    -> Result<Vec<Order>>;

    /// Returns the quantity of every handled order for a product.
    async fn handled_quantities(&self, product: ProductId) -> Result<Vec<i32>>;

    /// Counts a customer's handled orders for a product.
    async fn count_handled(&self, customer: UserId, product: ProductId) -> Result<i64>;
}

/// Everything the order service needs from persistence.
pub trait Repository: AddressStore + OrderStore {}

impl<T: AddressStore + OrderStore + ?Sized> Repository for T {}
