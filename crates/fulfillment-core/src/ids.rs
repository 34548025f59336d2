//! Newtype IDs for type-safe identifiers.
//!
//! Each entity gets its own ID type so an `OrderId` can never be passed
//! where a `PaymentId` is expected. IDs order lexically, which is what the
//! checkout relies on to touch inventory rows in a deterministic order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate newtype ID structs.
macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        /// A unique identifier.
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an ID from an existing string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a new unique ID.
            pub fn generate() -> Self {
                Self(generate_id($prefix))
            }

            /// Get the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(ProductId, "prod");
define_id!(UserId, "user");
define_id!(AddressId, "addr");
define_id!(CartId, "cart");
define_id!(CartItemId, "line");
define_id!(CouponId, "cpn");
define_id!(OrderId, "ord");
define_id!(OrderItemId, "oli");
define_id!(PaymentId, "pay");
define_id!(ShipmentId, "shp");

fn generate_id(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_creation() {
        let id = ProductId::new("prod-123");
        assert_eq!(id.as_str(), "prod-123");
    }

    #[test]
    fn test_id_generation_is_unique_and_prefixed() {
        let id1 = OrderId::generate();
        let id2 = OrderId::generate();
        assert_ne!(id1, id2);
        assert!(id1.as_str().starts_with("ord_"));
    }

    #[test]
    fn test_ids_order_lexically() {
        let mut ids = vec![ProductId::new("b"), ProductId::new("c"), ProductId::new("a")];
        ids.sort();
        assert_eq!(ids, vec![ProductId::new("a"), ProductId::new("b"), ProductId::new("c")]);
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&PaymentId::new("pay-1")).unwrap();
        assert_eq!(json, "\"pay-1\"");
    }
}
