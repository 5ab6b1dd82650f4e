//! Order placement and management.

mod model;
mod sagas;
mod service;

pub use model::{LineItem, OrderView, PlaceOrder, PlacedOrder, ShippingAddress};
pub use sagas::PlacementState;
pub use service::OrderService;
