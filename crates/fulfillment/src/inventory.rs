//! Inventory ledger: per-product on-hand and reserved counts.
//!
//! Every movement is appended to the product's adjustment history.

use chrono::{DateTime, Utc};
use fulfillment_core::prelude::*;
use fulfillment_store::Transaction;
use tracing::debug;

/// Current row for a product.
pub fn level<T: Transaction>(
    tx: &T,
    product_id: &ProductId,
) -> Result<Option<InventoryLevel>, FulfillmentError> {
    Ok(tx.inventory(product_id)?)
}

/// Availability pre-check. A product without a row has nothing available.
pub fn check<T: Transaction>(
    tx: &T,
    product_id: &ProductId,
    quantity: i64,
) -> Result<(), FulfillmentError> {
    let available = tx
        .inventory(product_id)?
        .map(|level| level.available())
        .unwrap_or(0);
    if available < quantity {
        return Err(FulfillmentError::InsufficientStock {
            product_id: product_id.clone(),
            requested: quantity,
            available,
        });
    }
    Ok(())
}

/// Reserve stock for an order.
pub fn reserve<T: Transaction>(
    tx: &mut T,
    product_id: &ProductId,
    quantity: i64,
    order_id: &OrderId,
    now: DateTime<Utc>,
) -> Result<InventoryLevel, FulfillmentError> {
    let mut level = tx
        .inventory(product_id)?
        .ok_or_else(|| FulfillmentError::InsufficientStock {
            product_id: product_id.clone(),
            requested: quantity,
            available: 0,
        })?;
    level.reserve(quantity, now)?;
    tx.put_inventory(level.clone())?;
    tx.record_adjustment(
        InventoryAdjustment::reservation(product_id.clone(), quantity, now)
            .with_reference(order_id.as_str()),
    )?;
    debug!(product_id = %product_id, quantity, reserved = level.reserved, "stock reserved");
    Ok(level)
}

/// Return reserved stock. Returns `None` when the product has no row.
pub fn release<T: Transaction>(
    tx: &mut T,
    product_id: &ProductId,
    quantity: i64,
    order_id: &OrderId,
    now: DateTime<Utc>,
) -> Result<Option<InventoryLevel>, FulfillmentError> {
    let Some(mut level) = tx.inventory(product_id)? else {
        return Ok(None);
    };
    level.release(quantity, now)?;
    tx.put_inventory(level.clone())?;
    tx.record_adjustment(
        InventoryAdjustment::release(product_id.clone(), quantity, now)
            .with_reference(order_id.as_str()),
    )?;
    debug!(product_id = %product_id, quantity, reserved = level.reserved, "stock released");
    Ok(Some(level))
}

/// Administrative change to on-hand stock. Creates the row on first use.
pub fn adjust<T: Transaction>(
    tx: &mut T,
    product_id: &ProductId,
    delta: i64,
    reason: AdjustmentReason,
    now: DateTime<Utc>,
) -> Result<InventoryLevel, FulfillmentError> {
    if tx.product(product_id)?.is_none() {
        return Err(FulfillmentError::ProductNotFound(product_id.clone()));
    }
    let mut level = tx
        .inventory(product_id)?
        .unwrap_or_else(|| InventoryLevel::new(product_id.clone(), 0, now));
    level.adjust(delta, now)?;
    tx.put_inventory(level.clone())?;
    tx.record_adjustment(InventoryAdjustment::stock_change(
        product_id.clone(),
        delta,
        reason,
        now,
    ))?;
    debug!(
        product_id = %product_id,
        delta,
        reason = reason.as_str(),
        quantity = level.quantity,
        "stock adjusted"
    );
    Ok(level)
}

/// Movement history for a product, oldest first.
pub fn history<T: Transaction>(
    tx: &T,
    product_id: &ProductId,
) -> Result<Vec<InventoryAdjustment>, FulfillmentError> {
    Ok(tx.adjustments(product_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fulfillment_store::{MemoryStore, Store};

    fn stocked(store: &MemoryStore, quantity: i64) -> ProductId {
        let now = Utc::now();
        let pid = ProductId::new("p1");
        let mut tx = store.begin().unwrap();
        tx.put_product(Product::new(pid.clone(), "SKU-1", "Widget", Money::new(1000, Currency::USD), now))
            .unwrap();
        adjust(&mut tx, &pid, quantity, AdjustmentReason::Restock, now).unwrap();
        tx.commit().unwrap();
        pid
    }

    #[test]
    fn test_check_without_row_reports_zero_available() {
        let store = MemoryStore::new().unwrap();
        let tx = store.begin().unwrap();
        let err = check(&tx, &ProductId::new("ghost"), 1).unwrap_err();
        assert_eq!(
            err,
            FulfillmentError::InsufficientStock {
                product_id: ProductId::new("ghost"),
                requested: 1,
                available: 0,
            }
        );
    }

    #[test]
    fn test_reserve_and_release_are_recorded() {
        let store = MemoryStore::new().unwrap();
        let pid = stocked(&store, 5);
        let order_id = OrderId::new("o1");
        let now = Utc::now();

        let mut tx = store.begin().unwrap();
        let level = reserve(&mut tx, &pid, 2, &order_id, now).unwrap();
        assert_eq!(level.available(), 3);
        let level = release(&mut tx, &pid, 2, &order_id, now).unwrap().unwrap();
        assert_eq!(level.reserved, 0);

        let reasons: Vec<_> = history(&tx, &pid).unwrap().into_iter().map(|a| a.reason).collect();
        assert_eq!(
            reasons,
            vec![AdjustmentReason::Restock, AdjustmentReason::Reserved, AdjustmentReason::Released]
        );
    }

    #[test]
    fn test_release_does_not_clamp() {
        let store = MemoryStore::new().unwrap();
        let pid = stocked(&store, 5);
        let mut tx = store.begin().unwrap();
        let level = release(&mut tx, &pid, 3, &OrderId::new("o1"), Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(level.reserved, -3);
    }

    #[test]
    fn test_adjust_below_reserved_rejected() {
        let store = MemoryStore::new().unwrap();
        let pid = stocked(&store, 5);
        let now = Utc::now();
        let mut tx = store.begin().unwrap();
        reserve(&mut tx, &pid, 4, &OrderId::new("o1"), now).unwrap();

        let err = adjust(&mut tx, &pid, -2, AdjustmentReason::Correction, now).unwrap_err();
        assert!(matches!(err, FulfillmentError::InsufficientStock { .. }));
        assert_eq!(level(&tx, &pid).unwrap().unwrap().quantity, 5);
    }

    #[test]
    fn test_adjust_unknown_product() {
        let store = MemoryStore::new().unwrap();
        let mut tx = store.begin().unwrap();
        let err = adjust(&mut tx, &ProductId::new("ghost"), 5, AdjustmentReason::Restock, Utc::now())
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::ProductNotFound(_)));
    }
}
