//! Domain events that move an order's status from outside the order.
//!
//! Payments and shipments never write the order status directly; they emit
//! an [`OrderEvent`] that the order status machine consumes inside the same
//! transaction and reports back as a [`StatusChange`].

use crate::checkout::OrderStatus;
use crate::ids::{OrderId, PaymentId, ShipmentId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    PaymentCaptured {
        order_id: OrderId,
        payment_id: PaymentId,
    },
    PaymentRefunded {
        order_id: OrderId,
        payment_id: PaymentId,
    },
    ShipmentDelivered {
        order_id: OrderId,
        shipment_id: ShipmentId,
    },
}

impl OrderEvent {
    pub fn order_id(&self) -> &OrderId {
        match self {
            OrderEvent::PaymentCaptured { order_id, .. }
            | OrderEvent::PaymentRefunded { order_id, .. }
            | OrderEvent::ShipmentDelivered { order_id, .. } => order_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OrderEvent::PaymentCaptured { .. } => "payment_captured",
            OrderEvent::PaymentRefunded { .. } => "payment_refunded",
            OrderEvent::ShipmentDelivered { .. } => "shipment_delivered",
        }
    }
}

/// An order status change caused by an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub cause: OrderEvent,
}
