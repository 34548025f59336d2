//! Order types.

use crate::checkout::OrderStatus;
use crate::ids::{AddressId, CouponId, OrderId, OrderItemId, ProductId, UserId};
use crate::money::{Currency, Money};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A placed order.
///
/// Amounts, items and addresses are fixed at creation. Only `status` and
/// the bookkeeping timestamps change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,
    /// Human-readable order number.
    pub order_number: String,
    /// Customer.
    pub user_id: UserId,
    /// Order status.
    pub status: OrderStatus,
    /// Frozen line snapshots.
    pub items: Vec<OrderItem>,
    /// Shipping address.
    pub shipping_address_id: AddressId,
    /// Billing address.
    pub billing_address_id: AddressId,
    /// Sum of line totals.
    pub subtotal: Money,
    /// Shipping charge.
    pub shipping: Money,
    /// Coupon discount.
    pub discount: Money,
    /// `subtotal + shipping - discount`.
    pub total: Money,
    /// Order currency.
    pub currency: Currency,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
    /// When the order was cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Generate a new order number.
    pub fn generate_order_number(now: DateTime<Utc>) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let short = suffix.get(..8).unwrap_or(&suffix).to_uppercase();
        format!("ORD-{}-{}", now.format("%Y%m%d"), short)
    }

    /// Whether `total == subtotal + shipping - discount`.
    pub fn is_balanced(&self) -> bool {
        self.subtotal
            .try_add(&self.shipping)
            .and_then(|gross| gross.try_subtract(&self.discount))
            .is_some_and(|expected| expected == self.total)
    }

    /// Get total item count.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Record a status change.
    pub fn set_status(&mut self, status: OrderStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
        if status == OrderStatus::Cancelled {
            self.cancelled_at = Some(now);
        }
    }
}

/// A frozen order line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    /// Unique line identifier.
    pub id: OrderItemId,
    /// Source product, if it still resolves.
    pub product_id: Option<ProductId>,
    /// SKU at time of order.
    pub sku: String,
    /// Product name at time of order.
    pub name: String,
    /// Unit price at time of order.
    pub unit_price: Money,
    /// Quantity ordered.
    pub quantity: i64,
    /// `unit_price * quantity`.
    pub line_total: Money,
}

/// The coupon that discounted an order. At most one per order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderCoupon {
    pub order_id: OrderId,
    pub coupon_id: CouponId,
    /// Code as entered at checkout.
    pub code: String,
    /// Discount granted.
    pub discount: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(subtotal: i64, shipping: i64, discount: i64, total: i64) -> Order {
        let now = Utc::now();
        let usd = |amount| Money::new(amount, Currency::USD);
        Order {
            id: OrderId::generate(),
            order_number: Order::generate_order_number(now),
            user_id: UserId::new("user-1"),
            status: OrderStatus::Pending,
            items: Vec::new(),
            shipping_address_id: AddressId::new("a1"),
            billing_address_id: AddressId::new("a1"),
            subtotal: usd(subtotal),
            shipping: usd(shipping),
            discount: usd(discount),
            total: usd(total),
            currency: Currency::USD,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        }
    }

    #[test]
    fn test_balanced_totals() {
        assert!(order(3000, 0, 300, 2700).is_balanced());
        assert!(!order(3000, 0, 300, 3000).is_balanced());
    }

    #[test]
    fn test_order_number_format() {
        let number = Order::generate_order_number(Utc::now());
        assert!(number.starts_with("ORD-"));
        assert_eq!(number.len(), "ORD-20240101-ABCDEF12".len());
    }

    #[test]
    fn test_cancel_stamps_cancelled_at() {
        let mut order = order(100, 0, 0, 100);
        let now = Utc::now();
        order.set_status(OrderStatus::Cancelled, now);
        assert_eq!(order.cancelled_at, Some(now));
    }
}
