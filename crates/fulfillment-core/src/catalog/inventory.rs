//! Inventory tracking types.

use crate::error::FulfillmentError;
use crate::ids::ProductId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stock row for one product.
///
/// `quantity` is on hand, `reserved` is committed to orders that have not
/// shipped. `quantity - reserved >= 0` must hold after every mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryLevel {
    /// Product this row tracks.
    pub product_id: ProductId,
    /// Total quantity in stock.
    pub quantity: i64,
    /// Quantity reserved for open orders.
    pub reserved: i64,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl InventoryLevel {
    /// Create a row with nothing reserved.
    pub fn new(product_id: ProductId, quantity: i64, now: DateTime<Utc>) -> Self {
        Self {
            product_id,
            quantity,
            reserved: 0,
            updated_at: now,
        }
    }

    /// Get available quantity (total minus reserved).
    pub fn available(&self) -> i64 {
        self.quantity - self.reserved
    }

    /// Check if a specific quantity is available.
    pub fn can_fulfill(&self, quantity: i64) -> bool {
        self.available() >= quantity
    }

    /// Whether the row satisfies `quantity - reserved >= 0`.
    pub fn is_consistent(&self) -> bool {
        self.available() >= 0
    }

    /// Reserve stock for an order.
    pub fn reserve(&mut self, quantity: i64, now: DateTime<Utc>) -> Result<(), FulfillmentError> {
        if quantity <= 0 {
            return Err(FulfillmentError::InvalidQuantity(quantity));
        }
        if !self.can_fulfill(quantity) {
            return Err(self.insufficient(quantity));
        }
        self.reserved = self
            .reserved
            .checked_add(quantity)
            .ok_or(FulfillmentError::Overflow)?;
        self.updated_at = now;
        Ok(())
    }

    /// Release reserved stock.
    ///
    /// Not clamped at zero: a release without a matching reserve drives
    /// `reserved` negative, which existing order data depends on.
    pub fn release(&mut self, quantity: i64, now: DateTime<Utc>) -> Result<(), FulfillmentError> {
        self.reserved = self
            .reserved
            .checked_sub(quantity)
            .ok_or(FulfillmentError::Overflow)?;
        self.updated_at = now;
        Ok(())
    }

    /// Administrative change to on-hand quantity.
    pub fn adjust(&mut self, delta: i64, now: DateTime<Utc>) -> Result<(), FulfillmentError> {
        let quantity = self
            .quantity
            .checked_add(delta)
            .ok_or(FulfillmentError::Overflow)?;
        if quantity - self.reserved < 0 {
            return Err(self.insufficient(delta.saturating_neg()));
        }
        self.quantity = quantity;
        self.updated_at = now;
        Ok(())
    }

    fn insufficient(&self, requested: i64) -> FulfillmentError {
        FulfillmentError::InsufficientStock {
            product_id: self.product_id.clone(),
            requested,
            available: self.available(),
        }
    }
}

/// Reason for an inventory movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    /// Reserved for a new order.
    Reserved,
    /// Released by a cancelled order.
    Released,
    /// Restocked from supplier.
    Restock,
    /// Manual correction.
    Correction,
}

impl AdjustmentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentReason::Reserved => "reserved",
            AdjustmentReason::Released => "released",
            AdjustmentReason::Restock => "restock",
            AdjustmentReason::Correction => "correction",
        }
    }
}

/// An inventory movement record (audit trail).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryAdjustment {
    /// Product that moved.
    pub product_id: ProductId,
    /// Change in on-hand quantity.
    pub quantity_change: i64,
    /// Change in reserved quantity.
    pub reserved_change: i64,
    /// Reason for the movement.
    pub reason: AdjustmentReason,
    /// Reference ID (e.g., order ID).
    pub reference_id: Option<String>,
    /// When it happened.
    pub recorded_at: DateTime<Utc>,
}

impl InventoryAdjustment {
    pub fn reservation(product_id: ProductId, quantity: i64, now: DateTime<Utc>) -> Self {
        Self {
            product_id,
            quantity_change: 0,
            reserved_change: quantity,
            reason: AdjustmentReason::Reserved,
            reference_id: None,
            recorded_at: now,
        }
    }

    pub fn release(product_id: ProductId, quantity: i64, now: DateTime<Utc>) -> Self {
        Self {
            product_id,
            quantity_change: 0,
            reserved_change: -quantity,
            reason: AdjustmentReason::Released,
            reference_id: None,
            recorded_at: now,
        }
    }

    pub fn stock_change(
        product_id: ProductId,
        delta: i64,
        reason: AdjustmentReason,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id,
            quantity_change: delta,
            reserved_change: 0,
            reason,
            reference_id: None,
            recorded_at: now,
        }
    }

    pub fn with_reference(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }
}
