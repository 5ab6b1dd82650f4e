pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use common::{AddressId, OrderId, ProductId, UserId};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use model::{Address, NewAddress, NewOrder, Order, OrderStatus};
pub use postgres::PostgresStore;
pub use store::{AddressStore, OrderStore, Repository};
