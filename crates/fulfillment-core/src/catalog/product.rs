//! Product type.

use crate::ids::ProductId;
use crate::money::{Currency, Money};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sellable product.
///
/// Orders never read prices from here after creation: cart lines freeze the
/// price at first add and order items freeze name and sku at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,
    /// Stock keeping unit.
    pub sku: String,
    /// Product name.
    pub name: String,
    /// Current list price.
    pub price: Money,
    /// Whether the product can be added to carts.
    pub active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Create a new active product.
    pub fn new(
        id: ProductId,
        sku: impl Into<String>,
        name: impl Into<String>,
        price: Money,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            sku: sku.into(),
            name: name.into(),
            price,
            active: true,
            created_at: now,
        }
    }

    pub fn currency(&self) -> Currency {
        self.price.currency
    }

    /// Mark the product inactive.
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }
}
