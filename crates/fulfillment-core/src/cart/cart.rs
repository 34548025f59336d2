//! Cart and cart line types.

use crate::catalog::Product;
use crate::error::FulfillmentError;
use crate::ids::{CartId, CartItemId, ProductId, UserId};
use crate::money::{Currency, Money};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default maximum quantity allowed per cart line.
pub const DEFAULT_MAX_QUANTITY_PER_LINE: i64 = 9999;

/// Cart lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartStatus {
    /// The user's current, mutable cart.
    #[default]
    Active,
    /// Turned into an order.
    Converted,
    /// Discarded by the user.
    Abandoned,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "ACTIVE",
            CartStatus::Converted => "CONVERTED",
            CartStatus::Abandoned => "ABANDONED",
        }
    }
}

/// A user's shopping cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    /// Unique cart identifier.
    pub id: CartId,
    /// Owning user.
    pub user_id: UserId,
    /// Lifecycle status.
    pub status: CartStatus,
    /// Lines in the cart, one per product.
    pub items: Vec<CartItem>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Create a new active cart for a user.
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: CartId::generate(),
            user_id,
            status: CartStatus::Active,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == CartStatus::Active
    }

    /// Add a product to the cart.
    ///
    /// A product already in the cart has its line incremented; the line
    /// keeps the price captured on the first add. A new line snapshots the
    /// product's current price.
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: i64,
        max_quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<CartItemId, FulfillmentError> {
        if quantity <= 0 {
            return Err(FulfillmentError::InvalidQuantity(quantity));
        }
        if !product.active {
            return Err(FulfillmentError::ProductInactive(product.id.clone()));
        }

        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            let new_quantity = existing
                .quantity
                .checked_add(quantity)
                .ok_or(FulfillmentError::Overflow)?;

            if new_quantity > max_quantity {
                return Err(FulfillmentError::QuantityExceedsLimit(new_quantity, max_quantity));
            }

            existing.quantity = new_quantity;
            let id = existing.id.clone();
            self.updated_at = now;
            return Ok(id);
        }

        if quantity > max_quantity {
            return Err(FulfillmentError::QuantityExceedsLimit(quantity, max_quantity));
        }

        if let Some(currency) = self.currency() {
            if currency != product.currency() {
                return Err(FulfillmentError::CurrencyMismatch {
                    expected: currency.code().to_string(),
                    got: product.currency().code().to_string(),
                });
            }
        }

        let item = CartItem {
            id: CartItemId::generate(),
            product_id: product.id.clone(),
            quantity,
            unit_price: product.price,
            added_at: now,
        };
        let id = item.id.clone();
        self.items.push(item);
        self.updated_at = now;
        Ok(id)
    }

    /// Set a line's quantity. Zero or less removes the line.
    pub fn update_quantity(
        &mut self,
        line_item_id: &CartItemId,
        quantity: i64,
        max_quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<(), FulfillmentError> {
        if quantity <= 0 {
            return self.remove_item(line_item_id, now).map(|_| ());
        }

        if quantity > max_quantity {
            return Err(FulfillmentError::QuantityExceedsLimit(quantity, max_quantity));
        }

        let item = self
            .items
            .iter_mut()
            .find(|i| &i.id == line_item_id)
            .ok_or_else(|| FulfillmentError::CartItemNotFound(line_item_id.clone()))?;
        item.quantity = quantity;
        self.updated_at = now;
        Ok(())
    }

    /// Remove a line from the cart.
    pub fn remove_item(
        &mut self,
        line_item_id: &CartItemId,
        now: DateTime<Utc>,
    ) -> Result<CartItem, FulfillmentError> {
        let position = self
            .items
            .iter()
            .position(|i| &i.id == line_item_id)
            .ok_or_else(|| FulfillmentError::CartItemNotFound(line_item_id.clone()))?;
        self.updated_at = now;
        Ok(self.items.remove(position))
    }

    /// End the cart's active life.
    pub fn close(&mut self, status: CartStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    /// Currency of the cart's lines, if it has any.
    pub fn currency(&self) -> Option<Currency> {
        self.items.first().map(|i| i.unit_price.currency)
    }

    /// Sum of frozen unit price times quantity over all lines.
    pub fn subtotal(&self) -> Result<Money, FulfillmentError> {
        let currency = self.currency().unwrap_or_default();
        self.items.iter().try_fold(Money::zero(currency), |acc, item| {
            if item.unit_price.currency != currency {
                return Err(FulfillmentError::CurrencyMismatch {
                    expected: currency.code().to_string(),
                    got: item.unit_price.currency.code().to_string(),
                });
            }
            let line = item.line_total().ok_or(FulfillmentError::Overflow)?;
            acc.try_add(&line).ok_or(FulfillmentError::Overflow)
        })
    }

    /// Get total item count (sum of quantities).
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get_item(&self, line_item_id: &CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.id == line_item_id)
    }

    pub fn get_item_by_product(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.product_id == product_id)
    }
}

/// A line in the cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    /// Unique line identifier.
    pub id: CartItemId,
    /// Product on this line.
    pub product_id: ProductId,
    /// Quantity.
    pub quantity: i64,
    /// Price snapshot taken when the line was created.
    pub unit_price: Money,
    /// When the line was created.
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.try_multiply(self.quantity)
    }
}
