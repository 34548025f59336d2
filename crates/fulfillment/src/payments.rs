//! Payment ledger.

use crate::orders;
use chrono::{DateTime, Utc};
use fulfillment_core::payment::total_in_status;
use fulfillment_core::prelude::*;
use fulfillment_store::Transaction;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A payment after a status write, with the order change it caused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub payment: Payment,
    pub order_change: Option<StatusChange>,
}

/// Open a payment for the full order total.
pub fn create<T: Transaction>(
    tx: &mut T,
    order_id: &OrderId,
    provider: &str,
    now: DateTime<Utc>,
) -> Result<Payment, FulfillmentError> {
    let order = orders::load(tx, order_id)?;
    let payment = Payment::new(order.id, provider, order.total, now);
    tx.put_payment(payment.clone())?;
    info!(
        payment_id = %payment.id,
        order_id = %payment.order_id,
        amount = %payment.amount,
        provider,
        "payment created"
    );
    Ok(payment)
}

pub fn for_order<T: Transaction>(
    tx: &T,
    order_id: &OrderId,
) -> Result<Vec<Payment>, FulfillmentError> {
    orders::load(tx, order_id)?;
    Ok(tx.payments_for_order(order_id)?)
}

/// Write a payment status.
///
/// CAPTURED raises `PaymentCaptured`. REFUNDED is only accepted while the
/// order's refunded total, this payment included, stays within its captured
/// total as stored before this write; it then raises `PaymentRefunded`.
pub fn update_status<T: Transaction>(
    tx: &mut T,
    payment_id: &PaymentId,
    to: PaymentStatus,
    now: DateTime<Utc>,
) -> Result<PaymentOutcome, FulfillmentError> {
    let mut payment = tx
        .payment(payment_id)?
        .ok_or_else(|| FulfillmentError::PaymentNotFound(payment_id.clone()))?;

    if to == PaymentStatus::Refunded {
        check_refund(tx, &payment)?;
    }

    let from = payment.status;
    payment.set_status(to, now);
    tx.put_payment(payment.clone())?;
    info!(payment_id = %payment.id, from = %from, to = %to, "payment status changed");

    let event = match to {
        PaymentStatus::Captured => Some(OrderEvent::PaymentCaptured {
            order_id: payment.order_id.clone(),
            payment_id: payment.id.clone(),
        }),
        PaymentStatus::Refunded => Some(OrderEvent::PaymentRefunded {
            order_id: payment.order_id.clone(),
            payment_id: payment.id.clone(),
        }),
        PaymentStatus::Created | PaymentStatus::Authorized | PaymentStatus::Failed => None,
    };
    let order_change = match event {
        Some(event) => orders::apply_event(tx, event, now)?,
        None => None,
    };

    Ok(PaymentOutcome {
        payment,
        order_change,
    })
}

fn check_refund<T: Transaction>(tx: &T, payment: &Payment) -> Result<(), FulfillmentError> {
    let payments = tx.payments_for_order(&payment.order_id)?;
    let captured = total_in_status(&payments, PaymentStatus::Captured)?;
    let already_refunded = total_in_status(
        payments.iter().filter(|p| p.id != payment.id),
        PaymentStatus::Refunded,
    )?;
    let amount = payment.amount.amount;

    let within = already_refunded
        .checked_add(amount)
        .is_some_and(|refunded| refunded <= captured);
    if captured <= 0 || !within {
        return Err(FulfillmentError::RefundExceedsCaptured {
            payment_id: payment.id.clone(),
            amount,
            captured,
            already_refunded,
        });
    }
    Ok(())
}
