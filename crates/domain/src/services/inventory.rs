//! Inventory service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Catalog data shown next to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub product_id: ProductId,
    pub name: String,
    /// Price in the smallest currency unit.
    pub price: i64,
    pub thumbnail: String,
}

/// Errors returned by the inventory collaborator.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Unknown product: {0}")]
    UnknownProduct(ProductId),

    #[error("Insufficient stock for product {product_id}: {available} available, {requested} requested")]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    #[error("Inventory service unavailable: {0}")]
    Unavailable(String),
}

/// Stock counts and product catalog owned by the inventory service.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Returns the units in stock for a product.
    async fn inventory_count(&self, product: ProductId) -> Result<i64, InventoryError>;

    /// Removes `quantity` units from stock.
    ///
    /// The check and the update are atomic: concurrent callers can never
    /// drive stock below zero.
    async fn decrement(&self, product: ProductId, quantity: i32) -> Result<(), InventoryError>;

    /// Returns `quantity` units to stock.
    async fn increment(&self, product: ProductId, quantity: i32) -> Result<(), InventoryError>;

    /// Looks up catalog data. Unknown ids are left out of the result.
    async fn products(&self, ids: &[ProductId]) -> Result<Vec<ProductSummary>, InventoryError>;
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    stock: HashMap<ProductId, i64>,
    catalog: HashMap<ProductId, ProductSummary>,
    fail_on_count: bool,
    fail_on_decrement: bool,
    fail_on_increment: bool,
    fail_on_products: bool,
}

/// In-memory inventory service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryService {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventoryService {
    /// Creates a new empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a product to the catalog with an initial stock count.
    pub async fn add_product(&self, product: ProductSummary, stock: i64) {
        let mut state = self.state.write().await;
        state.stock.insert(product.product_id, stock);
        state.catalog.insert(product.product_id, product);
    }

    /// Overwrites the stock count of a product.
    pub async fn set_stock(&self, product: ProductId, stock: i64) {
        self.state.write().await.stock.insert(product, stock);
    }

    /// Returns the stock count of a product, if known.
    pub async fn stock(&self, product: ProductId) -> Option<i64> {
        self.state.read().await.stock.get(&product).copied()
    }

    /// Configures `inventory_count` to fail.
    pub async fn set_fail_on_count(&self, fail: bool) {
        self.state.write().await.fail_on_count = fail;
    }

    /// Configures `decrement` to fail.
    pub async fn set_fail_on_decrement(&self, fail: bool) {
        self.state.write().await.fail_on_decrement = fail;
    }

    /// Configures `increment` to fail.
    pub async fn set_fail_on_increment(&self, fail: bool) {
        self.state.write().await.fail_on_increment = fail;
    }

    /// Configures `products` to fail.
    pub async fn set_fail_on_products(&self, fail: bool) {
        self.state.write().await.fail_on_products = fail;
    }
}

#[async_trait]
impl InventoryService for InMemoryInventoryService {
    async fn inventory_count(&self, product: ProductId) -> Result<i64, InventoryError> {
        let state = self.state.read().await;
        if state.fail_on_count {
            return Err(InventoryError::Unavailable("count disabled".to_string()));
        }

        state
            .stock
            .get(&product)
            .copied()
            .ok_or(InventoryError::UnknownProduct(product))
    }

    async fn decrement(&self, product: ProductId, quantity: i32) -> Result<(), InventoryError> {
        let mut state = self.state.write().await;
        if state.fail_on_decrement {
            return Err(InventoryError::Unavailable("decrement disabled".to_string()));
        }

        let available = state
            .stock
            .get_mut(&product)
            .ok_or(InventoryError::UnknownProduct(product))?;
        let requested = i64::from(quantity);
        if *available < requested {
            return Err(InventoryError::InsufficientStock {
                product_id: product,
                available: *available,
                requested,
            });
        }
        *available -= requested;
        Ok(())
    }

    async fn increment(&self, product: ProductId, quantity: i32) -> Result<(), InventoryError> {
        let mut state = self.state.write().await;
        if state.fail_on_increment {
            return Err(InventoryError::Unavailable("increment disabled".to_string()));
        }

        let available = state
            .stock
            .get_mut(&product)
            .ok_or(InventoryError::UnknownProduct(product))?;
        *available += i64::from(quantity);
        Ok(())
    }

    async fn products(&self, ids: &[ProductId]) -> Result<Vec<ProductSummary>, InventoryError> {
        let state = self.state.read().await;
        if state.fail_on_products {
            return Err(InventoryError::Unavailable("catalog disabled".to_string()));
        }

        Ok(ids
            .iter()
            .filter_map(|id| state.catalog.get(id).cloned())
            .collect())
    }
}
