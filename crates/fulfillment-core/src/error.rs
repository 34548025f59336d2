//! Fulfillment error types.

use crate::cart::CouponRejection;
use crate::checkout::OrderStatus;
use crate::ids::{AddressId, CartItemId, OrderId, PaymentId, ProductId, ShipmentId};
use thiserror::Error;

/// Errors returned by fulfillment operations.
///
/// Everything except [`FulfillmentError::Internal`] is a business-rule
/// rejection that the caller can act on. Nothing is retried internally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FulfillmentError {
    /// The user has no active cart or the cart has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Address is missing or belongs to another user.
    #[error("Invalid address: {0}")]
    InvalidAddress(AddressId),

    /// Coupon failed validation.
    #[error("Invalid coupon {code}: {reason}")]
    InvalidCoupon {
        code: String,
        reason: CouponRejection,
    },

    /// Not enough unreserved stock.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// Order status edge not in the transition table.
    #[error("Illegal order transition from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    /// Operation needs a captured payment on the order.
    #[error("Order {0} has no captured payment")]
    PaymentRequired(OrderId),

    /// Refund would exceed what was captured on the order.
    #[error("Refund of {amount} on {payment_id} exceeds captured {captured} (already refunded {already_refunded})")]
    RefundExceedsCaptured {
        payment_id: PaymentId,
        amount: i64,
        captured: i64,
        already_refunded: i64,
    },

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Payment not found.
    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    /// Shipment not found.
    #[error("Shipment not found: {0}")]
    ShipmentNotFound(ShipmentId),

    /// Product not found.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Product exists but is not for sale.
    #[error("Product is inactive: {0}")]
    ProductInactive(ProductId),

    /// Item not in the caller's active cart.
    #[error("Item not in cart: {0}")]
    CartItemNotFound(CartItemId),

    /// Coupon code already registered.
    #[error("Coupon code already exists: {0}")]
    CouponCodeTaken(String),

    /// Coupon value outside its allowed range.
    #[error("Invalid coupon value: {0}")]
    InvalidCouponValue(i64),

    /// Invalid quantity.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Quantity exceeds maximum allowed.
    #[error("Quantity {0} exceeds maximum allowed ({1})")]
    QuantityExceedsLimit(i64, i64),

    /// Currency mismatch.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// Storage or other internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FulfillmentError {
    /// True for business-rule rejections, false for internal failures.
    pub fn is_business_rule(&self) -> bool {
        !matches!(self, FulfillmentError::Internal(_))
    }

    /// Short machine-readable kind, used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            FulfillmentError::EmptyCart => "EMPTY_CART",
            FulfillmentError::InvalidAddress(_) => "INVALID_ADDRESS",
            FulfillmentError::InvalidCoupon { .. } => "INVALID_COUPON",
            FulfillmentError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            FulfillmentError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            FulfillmentError::PaymentRequired(_) => "PAYMENT_REQUIRED",
            FulfillmentError::RefundExceedsCaptured { .. } => "REFUND_EXCEEDS_CAPTURED",
            FulfillmentError::OrderNotFound(_)
            | FulfillmentError::PaymentNotFound(_)
            | FulfillmentError::ShipmentNotFound(_)
            | FulfillmentError::ProductNotFound(_)
            | FulfillmentError::CartItemNotFound(_) => "NOT_FOUND",
            FulfillmentError::ProductInactive(_) => "PRODUCT_INACTIVE",
            FulfillmentError::CouponCodeTaken(_) => "COUPON_CODE_TAKEN",
            FulfillmentError::InvalidCouponValue(_)
            | FulfillmentError::InvalidQuantity(_)
            | FulfillmentError::QuantityExceedsLimit(..)
            | FulfillmentError::CurrencyMismatch { .. } => "VALIDATION",
            FulfillmentError::Overflow => "OVERFLOW",
            FulfillmentError::Internal(_) => "INTERNAL",
        }
    }
}
