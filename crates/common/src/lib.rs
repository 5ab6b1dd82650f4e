//! Shared identifier types for the order service crates.

pub mod types;

pub use types::{AddressId, OrderId, ProductId, UserId};
