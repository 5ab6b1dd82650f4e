use thiserror::Error;

use crate::{AddressId, OrderId, OrderStatus};

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No address exists with the given id.
    #[error("Address not found: {0}")]
    AddressNotFound(AddressId),

    /// No order exists with the given id.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The order is not in the status a conditional transition expected.
    #[error("Order {id} is {actual}, expected {expected}")]
    StatusConflict {
        id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// A persisted status value is not one of the known statuses.
    #[error("Invalid order status: {0}")]
    InvalidStatus(String),

    /// The store refused the operation (used by the in-memory store's
    /// failure injection).
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns true if the error means the row does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::AddressNotFound(_) | StoreError::OrderNotFound(_)
        )
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
