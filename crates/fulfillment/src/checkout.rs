//! Checkout: turn the user's ACTIVE cart into a PENDING order.

use crate::{carts, coupons, inventory};
use chrono::{DateTime, Utc};
use fulfillment_core::prelude::*;
use fulfillment_store::Transaction;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Input to [`create_order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: UserId,
    pub shipping_address_id: AddressId,
    pub billing_address_id: AddressId,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

impl CheckoutRequest {
    /// Ship and bill to the same address.
    pub fn new(user_id: UserId, address_id: AddressId) -> Self {
        Self {
            user_id,
            shipping_address_id: address_id.clone(),
            billing_address_id: address_id,
            coupon_code: None,
        }
    }

    pub fn with_coupon(mut self, code: impl Into<String>) -> Self {
        self.coupon_code = Some(code.into());
        self
    }
}

/// Create an order from the user's ACTIVE cart.
///
/// Validation, pricing and the stock pre-check all run before the first
/// write. Lines are reserved in product-id order.
pub fn create_order<T: Transaction>(
    tx: &mut T,
    request: &CheckoutRequest,
    now: DateTime<Utc>,
) -> Result<Order, FulfillmentError> {
    let cart = match tx.active_cart(&request.user_id)? {
        Some(cart) if !cart.is_empty() => cart,
        _ => return Err(FulfillmentError::EmptyCart),
    };

    for address_id in [&request.shipping_address_id, &request.billing_address_id] {
        let owned = tx
            .address(address_id)?
            .is_some_and(|address| address.is_owned_by(&request.user_id));
        if !owned {
            return Err(FulfillmentError::InvalidAddress(address_id.clone()));
        }
    }

    let subtotal = cart.subtotal()?;
    let currency = subtotal.currency;

    let coupon = request
        .coupon_code
        .as_deref()
        .map(|code| coupons::resolve(tx, code, subtotal.amount, now))
        .transpose()?;

    let shipping = Money::zero(currency);
    let discount = coupon
        .as_ref()
        .map(|coupon| coupons::compute_discount(subtotal, coupon))
        .unwrap_or_else(|| Money::zero(currency));
    let total = subtotal
        .try_add(&shipping)
        .and_then(|gross| gross.try_subtract(&discount))
        .ok_or(FulfillmentError::Overflow)?;

    let mut lines: Vec<&CartItem> = cart.items.iter().collect();
    lines.sort_by(|a, b| a.product_id.cmp(&b.product_id));

    let mut snapshots = Vec::with_capacity(lines.len());
    for line in &lines {
        let product = tx
            .product(&line.product_id)?
            .ok_or_else(|| FulfillmentError::ProductNotFound(line.product_id.clone()))?;
        inventory::check(tx, &line.product_id, line.quantity)?;
        snapshots.push(product);
    }

    let order_id = OrderId::generate();
    for line in &lines {
        inventory::reserve(tx, &line.product_id, line.quantity, &order_id, now)?;
    }

    let items = lines
        .iter()
        .zip(snapshots)
        .map(|(line, product)| {
            Ok(OrderItem {
                id: OrderItemId::generate(),
                product_id: Some(product.id),
                sku: product.sku,
                name: product.name,
                unit_price: line.unit_price,
                quantity: line.quantity,
                line_total: line.line_total().ok_or(FulfillmentError::Overflow)?,
            })
        })
        .collect::<Result<Vec<_>, FulfillmentError>>()?;

    let order = Order {
        id: order_id,
        order_number: Order::generate_order_number(now),
        user_id: request.user_id.clone(),
        status: OrderStatus::Pending,
        items,
        shipping_address_id: request.shipping_address_id.clone(),
        billing_address_id: request.billing_address_id.clone(),
        subtotal,
        shipping,
        discount,
        total,
        currency,
        created_at: now,
        updated_at: now,
        cancelled_at: None,
    };
    tx.put_order(order.clone())?;

    if let Some(coupon) = coupon {
        tx.insert_order_coupon(OrderCoupon {
            order_id: order.id.clone(),
            coupon_id: coupon.id.clone(),
            code: coupon.code.clone(),
            discount,
        })?;
        coupons::commit_usage(tx, coupon)?;
    }

    carts::close_and_replace(tx, cart, CartStatus::Converted, now)?;

    info!(
        order_id = %order.id,
        order_number = %order.order_number,
        total = %order.total,
        lines = order.items.len(),
        "order created"
    );
    Ok(order)
}
