//! Domain error types.

use common::{AddressId, OrderId, ProductId};
use saga::{ExecutionError, SagaError};
use store::{OrderStatus, StoreError};
use thiserror::Error;

use crate::services::{AuthError, InventoryError};

/// Errors returned by [`OrderService`](crate::OrderService) operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The caller could not be authenticated.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// A shipping address field is blank.
    #[error("Invalid shipping address: {0} is required")]
    InvalidAddress(&'static str),

    /// A line item asks for zero or fewer units.
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: i32 },

    /// The order request has no line items.
    #[error("Order has no items")]
    NoItems,

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Address not found: {0}")]
    AddressNotFound(AddressId),

    /// The caller is authenticated but not allowed to act on the resource.
    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    /// The order is not in a status that allows the operation.
    #[error("Order {order_id} is {status}, expected {expected}")]
    InvalidState {
        order_id: OrderId,
        status: OrderStatus,
        expected: OrderStatus,
    },

    /// The placement saga stopped on a forward failure.
    #[error("Order placement failed: {0}")]
    PlacementFailed(#[source] ExecutionError),

    /// The cancellation saga stopped on a forward failure.
    #[error("Order cancellation failed: {0}")]
    CancellationFailed(#[source] ExecutionError),

    /// A saga could not be assembled.
    #[error("Saga error: {0}")]
    Saga(#[from] SagaError),

    #[error("Store error: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for OrderError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AddressNotFound(id) => OrderError::AddressNotFound(id),
            StoreError::OrderNotFound(id) => OrderError::OrderNotFound(id),
            StoreError::StatusConflict {
                id,
                expected,
                actual,
            } => OrderError::InvalidState {
                order_id: id,
                status: actual,
                expected,
            },
            other => OrderError::Store(other),
        }
    }
}

impl OrderError {
    /// Returns the inventory error behind a failed saga step, if any.
    pub fn inventory_cause(&self) -> Option<&InventoryError> {
        match self {
            OrderError::PlacementFailed(e) | OrderError::CancellationFailed(e) => {
                e.error.downcast_ref::<InventoryError>()
            }
            _ => None,
        }
    }
}
