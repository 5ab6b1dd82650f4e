use serde::{Deserialize, Serialize};

/// Declares a typed wrapper around a database row identifier.
///
/// Each id is a distinct type so an `AddressId` can never be passed where an
/// `OrderId` is expected, even though both are `BIGSERIAL` keys.
macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw identifier.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw identifier.
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

row_id!(
    /// Identifier of an authenticated user, either a customer or a supplier.
    UserId
);

row_id!(
    /// Identifier of a stored shipping address.
    AddressId
);

row_id!(
    /// Identifier of a stored order row.
    OrderId
);

row_id!(
    /// Identifier of a product owned by the inventory service.
    ProductId
);
