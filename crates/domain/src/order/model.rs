//! Validated order requests and the views returned to callers.

use common::{ProductId, UserId};
use saga::RunId;
use serde::Serialize;
use store::{Address, NewAddress, Order};

use crate::error::OrderError;
use crate::services::ProductSummary;

/// A shipping address with every field present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingAddress {
    name: String,
    phone: String,
    detail: String,
}

impl ShippingAddress {
    /// Validates and builds an address. Blank fields are rejected.
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        detail: impl Into<String>,
    ) -> Result<Self, OrderError> {
        let name = required(name.into(), "name")?;
        let phone = required(phone.into(), "phone")?;
        let detail = required(detail.into(), "detail")?;
        Ok(Self {
            name,
            phone,
            detail,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<ShippingAddress> for NewAddress {
    fn from(address: ShippingAddress) -> Self {
        NewAddress {
            name: address.name,
            phone: address.phone,
            detail: address.detail,
        }
    }
}

fn required(value: String, field: &'static str) -> Result<String, OrderError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(OrderError::InvalidAddress(field));
    }
    Ok(trimmed.to_string())
}

/// One product from one supplier in an order request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItem {
    product_id: ProductId,
    supplier_id: UserId,
    quantity: i32,
}

impl LineItem {
    /// Builds a line item. The quantity must be positive.
    pub fn new(product_id: ProductId, supplier_id: UserId, quantity: i32) -> Result<Self, OrderError> {
        if quantity <= 0 {
            return Err(OrderError::InvalidQuantity {
                product_id,
                quantity,
            });
        }
        Ok(Self {
            product_id,
            supplier_id,
            quantity,
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn supplier_id(&self) -> UserId {
        self.supplier_id
    }

    pub fn quantity(&self) -> i32 {
        self.quantity
    }
}

/// A complete order request: where to ship and what to ship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    address: ShippingAddress,
    items: Vec<LineItem>,
}

impl PlaceOrder {
    /// Builds a request. At least one line item is required.
    pub fn new(address: ShippingAddress, items: Vec<LineItem>) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }
        Ok(Self { address, items })
    }

    pub fn address(&self) -> &ShippingAddress {
        &self.address
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub(crate) fn into_parts(self) -> (ShippingAddress, Vec<LineItem>) {
        (self.address, self.items)
    }
}

/// Rows written by a successful placement.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub run_id: RunId,
    pub address: Address,
    pub orders: Vec<Order>,
}

/// An order enriched with catalog data and its shipping address.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub product: ProductSummary,
    /// `None` when the address row is gone.
    pub address: Option<Address>,
}
