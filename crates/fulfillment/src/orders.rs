//! Order status machine.
//!
//! Explicit updates follow the transition table in
//! [`OrderStatus::allowed_targets`]. Events raised by payments and shipments
//! go through [`apply_event`] instead and are not bound by the table.

use crate::inventory;
use chrono::{DateTime, Utc};
use fulfillment_core::payment::total_in_status;
use fulfillment_core::prelude::*;
use fulfillment_store::Transaction;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// An order with everything linked to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub coupon: Option<OrderCoupon>,
    pub payments: Vec<Payment>,
    pub shipments: Vec<Shipment>,
}

impl OrderDetails {
    /// Sum of captured payment amounts, in minor units.
    pub fn captured_total(&self) -> Result<i64, FulfillmentError> {
        total_in_status(&self.payments, PaymentStatus::Captured)
    }

    /// Sum of refunded payment amounts, in minor units.
    pub fn refunded_total(&self) -> Result<i64, FulfillmentError> {
        total_in_status(&self.payments, PaymentStatus::Refunded)
    }
}

pub(crate) fn load<T: Transaction>(tx: &T, order_id: &OrderId) -> Result<Order, FulfillmentError> {
    tx.order(order_id)?
        .ok_or_else(|| FulfillmentError::OrderNotFound(order_id.clone()))
}

pub fn details<T: Transaction>(
    tx: &T,
    order_id: &OrderId,
) -> Result<OrderDetails, FulfillmentError> {
    let order = load(tx, order_id)?;
    Ok(OrderDetails {
        coupon: tx.order_coupon(order_id)?,
        payments: tx.payments_for_order(order_id)?,
        shipments: tx.shipments_for_order(order_id)?,
        order,
    })
}

/// Whether any payment on the order is CAPTURED.
pub fn has_captured_payment<T: Transaction>(
    tx: &T,
    order_id: &OrderId,
) -> Result<bool, FulfillmentError> {
    Ok(tx
        .payments_for_order(order_id)?
        .iter()
        .any(Payment::is_captured))
}

/// Move an order to `to`.
///
/// Same status is a no-op without a write.
pub fn update_status<T: Transaction>(
    tx: &mut T,
    order_id: &OrderId,
    to: OrderStatus,
    now: DateTime<Utc>,
) -> Result<Order, FulfillmentError> {
    let mut order = load(tx, order_id)?;
    let from = order.status;
    if from == to {
        return Ok(order);
    }
    if !from.can_transition_to(to) {
        return Err(FulfillmentError::IllegalTransition { from, to });
    }
    if to.requires_captured_payment() && !has_captured_payment(tx, order_id)? {
        return Err(FulfillmentError::PaymentRequired(order_id.clone()));
    }
    if to == OrderStatus::Cancelled {
        release_reservations(tx, &order, now)?;
    }

    order.set_status(to, now);
    tx.put_order(order.clone())?;
    info!(order_id = %order_id, from = %from, to = %to, "order status changed");
    Ok(order)
}

/// Apply a payment or shipment event to its order.
pub fn apply_event<T: Transaction>(
    tx: &mut T,
    event: OrderEvent,
    now: DateTime<Utc>,
) -> Result<Option<StatusChange>, FulfillmentError> {
    let mut order = load(tx, event.order_id())?;
    let from = order.status;
    let Some(to) = from.on_event(&event) else {
        debug!(order_id = %order.id, event = event.name(), status = %from, "event ignored");
        return Ok(None);
    };

    order.set_status(to, now);
    tx.put_order(order)?;
    info!(
        order_id = %event.order_id(),
        event = event.name(),
        from = %from,
        to = %to,
        "order status changed by event"
    );
    Ok(Some(StatusChange {
        order_id: event.order_id().clone(),
        from,
        to,
        cause: event,
    }))
}

/// Give back the stock reserved by an order's lines.
///
/// Lines whose product link is gone, or whose product has no inventory row,
/// are skipped.
fn release_reservations<T: Transaction>(
    tx: &mut T,
    order: &Order,
    now: DateTime<Utc>,
) -> Result<(), FulfillmentError> {
    for item in &order.items {
        let Some(product_id) = &item.product_id else {
            continue;
        };
        if inventory::release(tx, product_id, item.quantity, &order.id, now)?.is_none() {
            debug!(order_id = %order.id, product_id = %product_id, "no inventory row, release skipped");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fulfillment_store::{MemoryStore, Store};

    fn pending_order(tx: &mut impl Transaction, product_id: Option<ProductId>) -> Order {
        let now = Utc::now();
        let price = Money::new(1000, Currency::USD);
        let order = Order {
            id: OrderId::generate(),
            order_number: Order::generate_order_number(now),
            user_id: UserId::new("u1"),
            status: OrderStatus::Pending,
            items: vec![OrderItem {
                id: OrderItemId::generate(),
                product_id,
                sku: "SKU-1".into(),
                name: "Widget".into(),
                unit_price: price,
                quantity: 2,
                line_total: Money::new(2000, Currency::USD),
            }],
            shipping_address_id: AddressId::new("a1"),
            billing_address_id: AddressId::new("a1"),
            subtotal: Money::new(2000, Currency::USD),
            shipping: Money::zero(Currency::USD),
            discount: Money::zero(Currency::USD),
            total: Money::new(2000, Currency::USD),
            currency: Currency::USD,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        };
        tx.put_order(order.clone()).unwrap();
        order
    }

    #[test]
    fn test_same_status_is_noop() {
        let store = MemoryStore::new().unwrap();
        let mut tx = store.begin().unwrap();
        let order = pending_order(&mut tx, None);

        let later = Utc::now() + chrono::Duration::hours(1);
        let unchanged = update_status(&mut tx, &order.id, OrderStatus::Pending, later).unwrap();
        assert_eq!(unchanged, order);
    }

    #[test]
    fn test_illegal_edge() {
        let store = MemoryStore::new().unwrap();
        let mut tx = store.begin().unwrap();
        let order = pending_order(&mut tx, None);

        let err = update_status(&mut tx, &order.id, OrderStatus::Delivered, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            FulfillmentError::IllegalTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Delivered,
            }
        );
    }

    #[test]
    fn test_cancel_skips_missing_links_and_rows() {
        let store = MemoryStore::new().unwrap();
        let mut tx = store.begin().unwrap();
        let unlinked = pending_order(&mut tx, None);
        let no_row = pending_order(&mut tx, Some(ProductId::new("ghost")));

        for order in [unlinked, no_row] {
            let cancelled =
                update_status(&mut tx, &order.id, OrderStatus::Cancelled, Utc::now()).unwrap();
            assert_eq!(cancelled.status, OrderStatus::Cancelled);
            assert!(cancelled.cancelled_at.is_some());
        }
    }

    #[test]
    fn test_capture_event_only_moves_pending() {
        let store = MemoryStore::new().unwrap();
        let mut tx = store.begin().unwrap();
        let order = pending_order(&mut tx, None);
        let event = OrderEvent::PaymentCaptured {
            order_id: order.id.clone(),
            payment_id: PaymentId::new("pay1"),
        };

        let change = apply_event(&mut tx, event.clone(), Utc::now()).unwrap().unwrap();
        assert_eq!((change.from, change.to), (OrderStatus::Pending, OrderStatus::Paid));
        assert!(apply_event(&mut tx, event, Utc::now()).unwrap().is_none());
    }
}
