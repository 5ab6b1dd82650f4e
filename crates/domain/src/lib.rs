//! Domain layer for the order service.
//!
//! This crate provides:
//! - Validated order requests (`ShippingAddress`, `LineItem`, `PlaceOrder`)
//! - The placement and cancellation sagas
//! - `OrderService`, which authenticates callers, runs the sagas and serves
//!   order listings
//! - The auth and inventory collaborator interfaces with in-memory
//!   implementations

pub mod error;
pub mod order;
pub mod services;

pub use common::{AddressId, OrderId, ProductId, UserId};
pub use error::OrderError;
pub use order::{
    LineItem, OrderService, OrderView, PlaceOrder, PlacedOrder, PlacementState, ShippingAddress,
};
pub use services::{
    AuthError, AuthService, Claims, InMemoryAuthService, InMemoryInventoryService,
    InventoryError, InventoryService, ProductSummary, RequestMetadata, UserRole,
};
