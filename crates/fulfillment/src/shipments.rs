//! Shipment tracker.

use crate::orders;
use chrono::{DateTime, Utc};
use fulfillment_core::prelude::*;
use fulfillment_store::Transaction;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A shipment after an update, with the order change it caused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentOutcome {
    pub shipment: Shipment,
    pub order_change: Option<StatusChange>,
}

/// Open a shipment. The order needs a captured payment.
pub fn create<T: Transaction>(
    tx: &mut T,
    order_id: &OrderId,
    details: NewShipment,
    now: DateTime<Utc>,
) -> Result<Shipment, FulfillmentError> {
    orders::load(tx, order_id)?;
    if !orders::has_captured_payment(tx, order_id)? {
        return Err(FulfillmentError::PaymentRequired(order_id.clone()));
    }
    let shipment = Shipment::new(order_id.clone(), details, now);
    tx.put_shipment(shipment.clone())?;
    info!(
        shipment_id = %shipment.id,
        order_id = %order_id,
        carrier = shipment.carrier.as_deref().unwrap_or("-"),
        "shipment created"
    );
    Ok(shipment)
}

/// Apply a partial update. Setting DELIVERED raises `ShipmentDelivered`.
pub fn update<T: Transaction>(
    tx: &mut T,
    shipment_id: &ShipmentId,
    changes: ShipmentUpdate,
    now: DateTime<Utc>,
) -> Result<ShipmentOutcome, FulfillmentError> {
    let mut shipment = tx
        .shipment(shipment_id)?
        .ok_or_else(|| FulfillmentError::ShipmentNotFound(shipment_id.clone()))?;

    let delivered = changes.status == Some(ShipmentStatus::Delivered);
    shipment.apply(changes, now);
    tx.put_shipment(shipment.clone())?;
    info!(shipment_id = %shipment.id, status = %shipment.status, "shipment updated");

    let order_change = if delivered {
        orders::apply_event(
            tx,
            OrderEvent::ShipmentDelivered {
                order_id: shipment.order_id.clone(),
                shipment_id: shipment.id.clone(),
            },
            now,
        )?
    } else {
        None
    };

    Ok(ShipmentOutcome {
        shipment,
        order_change,
    })
}

pub fn for_order<T: Transaction>(
    tx: &T,
    order_id: &OrderId,
) -> Result<Vec<Shipment>, FulfillmentError> {
    orders::load(tx, order_id)?;
    Ok(tx.shipments_for_order(order_id)?)
}
