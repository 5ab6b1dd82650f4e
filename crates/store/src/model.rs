//! Records persisted by the order store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AddressId, OrderId, ProductId, StoreError, UserId};

/// Lifecycle status of an order row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed and waiting for the supplier.
    #[default]
    Waiting,
    /// Shipped by the supplier.
    Handled,
    /// Withdrawn by the customer or supplier.
    Cancelled,
}

impl OrderStatus {
    /// Returns the value stored in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Waiting => "waiting",
            OrderStatus::Handled => "handled",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(OrderStatus::Waiting),
            "handled" => Ok(OrderStatus::Handled),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(StoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// A stored shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub name: String,
    pub phone: String,
    pub detail: String,
}

/// Fields required to insert an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub name: String,
    pub phone: String,
    pub detail: String,
}

/// A stored order line: one product from one supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: UserId,
    pub supplier_id: UserId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub address_id: AddressId,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert an order. New orders start as
/// [`OrderStatus::Waiting`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_id: UserId,
    pub supplier_id: UserId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub address_id: AddressId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_round_trip() {
        for status in [
            OrderStatus::Waiting,
            OrderStatus::Handled,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let err = "shipped".parse::<OrderStatus>().unwrap_err();
        assert!(matches!(err, StoreError::InvalidStatus(s) if s == "shipped"));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Handled).unwrap();
        assert_eq!(json, "\"handled\"");
        assert_eq!(OrderStatus::default(), OrderStatus::Waiting);
    }
}
