//! External collaborators the order service calls through narrow interfaces.

pub mod auth;
pub mod inventory;

pub use auth::{AuthError, AuthService, Claims, InMemoryAuthService, RequestMetadata, UserRole};
pub use inventory::{InMemoryInventoryService, InventoryError, InventoryService, ProductSummary};
