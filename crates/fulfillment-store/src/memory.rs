//! In-memory store backed by redb.
//!
//! # Tables
//!
//! | Table | Key | Value |
//! |-------|-----|-------|
//! | `products`, `addresses`, `inventory` | id | JSON row |
//! | `carts`, `coupons`, `orders`, `payments`, `shipments` | id | JSON row |
//! | `order_coupons` | order_id | JSON `OrderCoupon` |
//! | `coupon_codes` | code | coupon_id |
//! | `inventory_adjustments` | `(product_id, sequence)` | JSON row |
//! | `*_by_user`, `*_by_order` | `(owner_id, sequence)` | row id |
//! | `sequence` | `"seq"` | `u64` |
//!
//! redb admits one write transaction at a time, so every [`MemoryTx`] is
//! serialized against the others. A transaction dropped without commit is
//! aborted.

use crate::{Store, StoreError, Transaction};
use fulfillment_core::prelude::*;
use redb::{backends::InMemoryBackend, Database, ReadableTable, TableDefinition, WriteTransaction};
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

type Rows = TableDefinition<'static, &'static str, &'static [u8]>;
type Index = TableDefinition<'static, (&'static str, u64), &'static str>;

const PRODUCTS: Rows = TableDefinition::new("products");
const ADDRESSES: Rows = TableDefinition::new("addresses");
const INVENTORY: Rows = TableDefinition::new("inventory");
const CARTS: Rows = TableDefinition::new("carts");
const COUPONS: Rows = TableDefinition::new("coupons");
const ORDERS: Rows = TableDefinition::new("orders");
const ORDER_COUPONS: Rows = TableDefinition::new("order_coupons");
const PAYMENTS: Rows = TableDefinition::new("payments");
const SHIPMENTS: Rows = TableDefinition::new("shipments");

const CARTS_BY_USER: Index = TableDefinition::new("carts_by_user");
const ORDERS_BY_USER: Index = TableDefinition::new("orders_by_user");
const PAYMENTS_BY_ORDER: Index = TableDefinition::new("payments_by_order");
const SHIPMENTS_BY_ORDER: Index = TableDefinition::new("shipments_by_order");

/// Coupon code to coupon id.
const COUPON_CODES: TableDefinition<&str, &str> = TableDefinition::new("coupon_codes");

/// Movement history: key = (product_id, sequence), value = JSON `InventoryAdjustment`.
const ADJUSTMENTS: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("inventory_adjustments");

/// Insertion counter shared by the index tables.
const SEQUENCE: TableDefinition<&str, u64> = TableDefinition::new("sequence");
const SEQUENCE_KEY: &str = "seq";

/// Serializable in-memory store.
pub struct MemoryStore {
    db: Database,
}

impl MemoryStore {
    /// Create an empty store with every table in place.
    pub fn new() -> Result<Self, StoreError> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;

        let txn = db.begin_write()?;
        for rows in [
            PRODUCTS,
            ADDRESSES,
            INVENTORY,
            CARTS,
            COUPONS,
            ORDERS,
            ORDER_COUPONS,
            PAYMENTS,
            SHIPMENTS,
        ] {
            txn.open_table(rows)?;
        }
        for index in [CARTS_BY_USER, ORDERS_BY_USER, PAYMENTS_BY_ORDER, SHIPMENTS_BY_ORDER] {
            txn.open_table(index)?;
        }
        txn.open_table(COUPON_CODES)?;
        txn.open_table(ADJUSTMENTS)?;
        txn.open_table(SEQUENCE)?;
        txn.commit()?;

        Ok(Self { db })
    }
}

impl Store for MemoryStore {
    type Tx<'a> = MemoryTx;

    fn begin(&self) -> Result<MemoryTx, StoreError> {
        Ok(MemoryTx {
            txn: Some(self.db.begin_write()?),
        })
    }
}

/// Transaction over a [`MemoryStore`]. Blocks other transactions until it
/// is committed or dropped.
pub struct MemoryTx {
    txn: Option<WriteTransaction>,
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    Ok(serde_json::from_slice(bytes)?)
}

impl MemoryTx {
    fn txn(&self) -> Result<&WriteTransaction, StoreError> {
        self.txn.as_ref().ok_or(StoreError::Finished)
    }

    fn get<T: DeserializeOwned>(&self, rows: Rows, key: &str) -> Result<Option<T>, StoreError> {
        let table = self.txn()?.open_table(rows)?;
        let row = match table.get(key)? {
            Some(value) => Some(decode(value.value())?),
            None => None,
        };
        Ok(row)
    }

    /// Insert or replace a row. Returns true if the key was new.
    fn put<T: Serialize>(&self, rows: Rows, key: &str, row: &T) -> Result<bool, StoreError> {
        let bytes = serde_json::to_vec(row)?;
        let mut table = self.txn()?.open_table(rows)?;
        let previous = table.insert(key, bytes.as_slice())?;
        Ok(previous.is_none())
    }

    fn next_sequence(&self) -> Result<u64, StoreError> {
        let mut table = self.txn()?.open_table(SEQUENCE)?;
        let next = match table.get(SEQUENCE_KEY)? {
            Some(current) => current.value() + 1,
            None => 1,
        };
        table.insert(SEQUENCE_KEY, next)?;
        Ok(next)
    }

    /// Append to a secondary index.
    fn push_index(&self, index: Index, owner: &str, id: &str) -> Result<(), StoreError> {
        let sequence = self.next_sequence()?;
        let mut table = self.txn()?.open_table(index)?;
        table.insert((owner, sequence), id)?;
        Ok(())
    }

    /// Row ids filed under `owner`, in insertion order.
    fn index_ids(&self, index: Index, owner: &str) -> Result<Vec<String>, StoreError> {
        let table = self.txn()?.open_table(index)?;
        let mut ids = Vec::new();
        for entry in table.range((owner, 0u64)..=(owner, u64::MAX))? {
            let (_key, id) = entry?;
            ids.push(id.value().to_string());
        }
        Ok(ids)
    }

    fn indexed<T: DeserializeOwned>(
        &self,
        index: Index,
        rows: Rows,
        owner: &str,
    ) -> Result<Vec<T>, StoreError> {
        let mut found = Vec::new();
        for id in self.index_ids(index, owner)? {
            if let Some(row) = self.get(rows, &id)? {
                found.push(row);
            }
        }
        Ok(found)
    }

    fn coupon_owner(&self, code: &str) -> Result<Option<String>, StoreError> {
        let table = self.txn()?.open_table(COUPON_CODES)?;
        let owner = table.get(code)?.map(|id| id.value().to_string());
        Ok(owner)
    }
}

impl Transaction for MemoryTx {
    fn product(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        self.get(PRODUCTS, id.as_str())
    }

    fn put_product(&mut self, product: Product) -> Result<(), StoreError> {
        self.put(PRODUCTS, product.id.as_str(), &product)?;
        Ok(())
    }

    fn address(&self, id: &AddressId) -> Result<Option<Address>, StoreError> {
        self.get(ADDRESSES, id.as_str())
    }

    fn put_address(&mut self, address: Address) -> Result<(), StoreError> {
        self.put(ADDRESSES, address.id.as_str(), &address)?;
        Ok(())
    }

    fn inventory(&self, product_id: &ProductId) -> Result<Option<InventoryLevel>, StoreError> {
        self.get(INVENTORY, product_id.as_str())
    }

    fn put_inventory(&mut self, level: InventoryLevel) -> Result<(), StoreError> {
        if !level.is_consistent() {
            return Err(StoreError::constraint(
                "inventory",
                format!(
                    "{}: reserved {} exceeds quantity {}",
                    level.product_id, level.reserved, level.quantity
                ),
            ));
        }
        self.put(INVENTORY, level.product_id.as_str(), &level)?;
        Ok(())
    }

    fn record_adjustment(&mut self, adjustment: InventoryAdjustment) -> Result<(), StoreError> {
        let sequence = self.next_sequence()?;
        let bytes = serde_json::to_vec(&adjustment)?;
        let mut table = self.txn()?.open_table(ADJUSTMENTS)?;
        table.insert((adjustment.product_id.as_str(), sequence), bytes.as_slice())?;
        Ok(())
    }

    fn adjustments(&self, product_id: &ProductId) -> Result<Vec<InventoryAdjustment>, StoreError> {
        let owner = product_id.as_str();
        let table = self.txn()?.open_table(ADJUSTMENTS)?;
        let mut rows = Vec::new();
        for entry in table.range((owner, 0u64)..=(owner, u64::MAX))? {
            let (_key, value) = entry?;
            rows.push(decode(value.value())?);
        }
        Ok(rows)
    }

    fn cart(&self, id: &CartId) -> Result<Option<Cart>, StoreError> {
        self.get(CARTS, id.as_str())
    }

    fn active_cart(&self, user_id: &UserId) -> Result<Option<Cart>, StoreError> {
        for id in self.index_ids(CARTS_BY_USER, user_id.as_str())?.into_iter().rev() {
            if let Some(cart) = self.get::<Cart>(CARTS, &id)? {
                if cart.is_active() {
                    return Ok(Some(cart));
                }
            }
        }
        Ok(None)
    }

    fn put_cart(&mut self, cart: Cart) -> Result<(), StoreError> {
        if cart.is_active() {
            if let Some(current) = self.active_cart(&cart.user_id)? {
                if current.id != cart.id {
                    return Err(StoreError::constraint(
                        "carts",
                        format!("user {} already has active cart {}", cart.user_id, current.id),
                    ));
                }
            }
        }
        if self.put(CARTS, cart.id.as_str(), &cart)? {
            self.push_index(CARTS_BY_USER, cart.user_id.as_str(), cart.id.as_str())?;
        }
        Ok(())
    }

    fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        match self.coupon_owner(code)? {
            Some(id) => self.get(COUPONS, &id),
            None => Ok(None),
        }
    }

    fn put_coupon(&mut self, coupon: Coupon) -> Result<(), StoreError> {
        if let Some(owner) = self.coupon_owner(&coupon.code)? {
            if owner != coupon.id.as_str() {
                return Err(StoreError::duplicate("coupons", coupon.code));
            }
        }
        if let Some(existing) = self.get::<Coupon>(COUPONS, coupon.id.as_str())? {
            if existing.code != coupon.code {
                return Err(StoreError::constraint(
                    "coupons",
                    format!("code of {} cannot change", coupon.id),
                ));
            }
        }
        if self.put(COUPONS, coupon.id.as_str(), &coupon)? {
            let mut codes = self.txn()?.open_table(COUPON_CODES)?;
            codes.insert(coupon.code.as_str(), coupon.id.as_str())?;
        }
        Ok(())
    }

    fn order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        self.get(ORDERS, id.as_str())
    }

    fn orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, StoreError> {
        self.indexed(ORDERS_BY_USER, ORDERS, user_id.as_str())
    }

    fn put_order(&mut self, order: Order) -> Result<(), StoreError> {
        if !order.is_balanced() {
            return Err(StoreError::constraint(
                "orders",
                format!(
                    "{}: total {} != subtotal {} + shipping {} - discount {}",
                    order.id, order.total, order.subtotal, order.shipping, order.discount
                ),
            ));
        }
        if self.put(ORDERS, order.id.as_str(), &order)? {
            self.push_index(ORDERS_BY_USER, order.user_id.as_str(), order.id.as_str())?;
        }
        Ok(())
    }

    fn order_coupon(&self, order_id: &OrderId) -> Result<Option<OrderCoupon>, StoreError> {
        self.get(ORDER_COUPONS, order_id.as_str())
    }

    fn insert_order_coupon(&mut self, link: OrderCoupon) -> Result<(), StoreError> {
        if self.order_coupon(&link.order_id)?.is_some() {
            return Err(StoreError::duplicate("order_coupons", link.order_id.as_str()));
        }
        self.put(ORDER_COUPONS, link.order_id.as_str(), &link)?;
        Ok(())
    }

    fn payment(&self, id: &PaymentId) -> Result<Option<Payment>, StoreError> {
        self.get(PAYMENTS, id.as_str())
    }

    fn payments_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, StoreError> {
        self.indexed(PAYMENTS_BY_ORDER, PAYMENTS, order_id.as_str())
    }

    fn put_payment(&mut self, payment: Payment) -> Result<(), StoreError> {
        if self.put(PAYMENTS, payment.id.as_str(), &payment)? {
            self.push_index(PAYMENTS_BY_ORDER, payment.order_id.as_str(), payment.id.as_str())?;
        }
        Ok(())
    }

    fn shipment(&self, id: &ShipmentId) -> Result<Option<Shipment>, StoreError> {
        self.get(SHIPMENTS, id.as_str())
    }

    fn shipments_for_order(&self, order_id: &OrderId) -> Result<Vec<Shipment>, StoreError> {
        self.indexed(SHIPMENTS_BY_ORDER, SHIPMENTS, order_id.as_str())
    }

    fn put_shipment(&mut self, shipment: Shipment) -> Result<(), StoreError> {
        if self.put(SHIPMENTS, shipment.id.as_str(), &shipment)? {
            self.push_index(
                SHIPMENTS_BY_ORDER,
                shipment.order_id.as_str(),
                shipment.id.as_str(),
            )?;
        }
        Ok(())
    }

    fn commit(mut self) -> Result<(), StoreError> {
        let txn = self.txn.take().ok_or(StoreError::Finished)?;
        txn.commit()?;
        Ok(())
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if let Some(txn) = self.txn.take() {
            if let Err(error) = txn.abort() {
                warn!(%error, "transaction abort failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn usd(amount: i64) -> Money {
        Money::new(amount, Currency::USD)
    }

    fn order(user: &str, subtotal: i64, discount: i64, total: i64) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::generate(),
            order_number: Order::generate_order_number(now),
            user_id: UserId::new(user),
            status: OrderStatus::Pending,
            items: Vec::new(),
            shipping_address_id: AddressId::new("a1"),
            billing_address_id: AddressId::new("a1"),
            subtotal: usd(subtotal),
            shipping: usd(0),
            discount: usd(discount),
            total: usd(total),
            currency: Currency::USD,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        }
    }

    #[test]
    fn test_commit_persists_writes() {
        let store = MemoryStore::new().unwrap();
        let pid = ProductId::new("p1");

        let mut tx = store.begin().unwrap();
        tx.put_inventory(InventoryLevel::new(pid.clone(), 10, Utc::now()))
            .unwrap();
        tx.commit().unwrap();

        let tx = store.begin().unwrap();
        assert_eq!(tx.inventory(&pid).unwrap().unwrap().quantity, 10);
    }

    #[test]
    fn test_drop_rolls_back_inserts_and_updates() {
        let store = MemoryStore::new().unwrap();
        let pid = ProductId::new("p1");

        let mut tx = store.begin().unwrap();
        tx.put_inventory(InventoryLevel::new(pid.clone(), 10, Utc::now()))
            .unwrap();
        tx.commit().unwrap();

        {
            let mut tx = store.begin().unwrap();
            let mut level = tx.inventory(&pid).unwrap().unwrap();
            level.reserve(4, Utc::now()).unwrap();
            tx.put_inventory(level).unwrap();
            tx.record_adjustment(InventoryAdjustment::reservation(pid.clone(), 4, Utc::now()))
                .unwrap();
            tx.put_inventory(InventoryLevel::new(ProductId::new("p2"), 1, Utc::now()))
                .unwrap();
        }

        let tx = store.begin().unwrap();
        assert_eq!(tx.inventory(&pid).unwrap().unwrap().reserved, 0);
        assert!(tx.inventory(&ProductId::new("p2")).unwrap().is_none());
        assert!(tx.adjustments(&pid).unwrap().is_empty());
    }

    #[test]
    fn test_rollback_on_panic() {
        let store = MemoryStore::new().unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut tx = store.begin().unwrap();
            tx.put_inventory(InventoryLevel::new(ProductId::new("p1"), 1, Utc::now()))
                .unwrap();
            panic!("boom");
        }));
        assert!(result.is_err());

        let tx = store.begin().unwrap();
        assert!(tx.inventory(&ProductId::new("p1")).unwrap().is_none());
    }

    #[test]
    fn test_transactions_are_serialized() {
        let store = MemoryStore::new().unwrap();
        let pid = ProductId::new("p1");
        let mut tx = store.begin().unwrap();
        tx.put_inventory(InventoryLevel::new(pid.clone(), 0, Utc::now()))
            .unwrap();
        tx.commit().unwrap();

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..25 {
                        let mut tx = store.begin().unwrap();
                        let mut level = tx.inventory(&pid).unwrap().unwrap();
                        level.adjust(1, Utc::now()).unwrap();
                        tx.put_inventory(level).unwrap();
                        tx.commit().unwrap();
                    }
                });
            }
        });

        let tx = store.begin().unwrap();
        assert_eq!(tx.inventory(&pid).unwrap().unwrap().quantity, 200);
    }

    #[test]
    fn test_inventory_constraint() {
        let store = MemoryStore::new().unwrap();
        let mut tx = store.begin().unwrap();
        let mut level = InventoryLevel::new(ProductId::new("p1"), 2, Utc::now());
        level.reserved = 3;
        let err = tx.put_inventory(level).unwrap_err();
        assert!(matches!(err, StoreError::Constraint { table: "inventory", .. }));
    }

    #[test]
    fn test_single_active_cart_per_user() {
        let store = MemoryStore::new().unwrap();
        let user = UserId::new("u1");
        let mut tx = store.begin().unwrap();

        let mut first = Cart::new(user.clone(), Utc::now());
        tx.put_cart(first.clone()).unwrap();
        let second = Cart::new(user.clone(), Utc::now());
        assert!(tx.put_cart(second.clone()).is_err());

        first.close(CartStatus::Converted, Utc::now());
        tx.put_cart(first).unwrap();
        tx.put_cart(second.clone()).unwrap();
        assert_eq!(tx.active_cart(&user).unwrap().unwrap().id, second.id);
    }

    #[test]
    fn test_coupon_codes_are_unique() {
        let store = MemoryStore::new().unwrap();
        let mut tx = store.begin().unwrap();
        tx.put_coupon(Coupon::percent("SAVE10", 10, Utc::now())).unwrap();
        let err = tx
            .put_coupon(Coupon::fixed("SAVE10", 500, Utc::now()))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::DuplicateKey { table: "coupons", ref key } if key == "SAVE10"
        ));

        let mut coupon = tx.coupon_by_code("SAVE10").unwrap().unwrap();
        coupon.record_usage();
        tx.put_coupon(coupon).unwrap();
        assert_eq!(tx.coupon_by_code("SAVE10").unwrap().unwrap().used_count, 1);
    }

    #[test]
    fn test_unbalanced_order_rejected() {
        let store = MemoryStore::new().unwrap();
        let mut tx = store.begin().unwrap();
        assert!(tx.put_order(order("u1", 3000, 300, 2700)).is_ok());
        assert!(tx.put_order(order("u1", 3000, 300, 3000)).is_err());
        assert_eq!(tx.orders_for_user(&UserId::new("u1")).unwrap().len(), 1);
    }

    #[test]
    fn test_order_coupon_insert_once() {
        let store = MemoryStore::new().unwrap();
        let mut tx = store.begin().unwrap();
        let link = OrderCoupon {
            order_id: OrderId::new("o1"),
            coupon_id: CouponId::new("c1"),
            code: "SAVE10".into(),
            discount: usd(300),
        };
        tx.insert_order_coupon(link.clone()).unwrap();
        assert!(tx.insert_order_coupon(link).is_err());
    }

    #[test]
    fn test_indexes_keep_creation_order() {
        let store = MemoryStore::new().unwrap();
        let order_id = OrderId::new("o1");
        let mut tx = store.begin().unwrap();
        let first = Payment::new(order_id.clone(), "stripe", usd(100), Utc::now());
        let second = Payment::new(order_id.clone(), "stripe", usd(100), Utc::now());
        tx.put_payment(first.clone()).unwrap();
        tx.put_payment(second.clone()).unwrap();
        tx.put_payment(first.clone()).unwrap();

        let ids: Vec<_> = tx
            .payments_for_order(&order_id)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[test]
    fn test_rows_round_trip_through_tables() {
        let store = MemoryStore::new().unwrap();
        let placed = order("u1", 3000, 300, 2700);
        let mut tx = store.begin().unwrap();
        tx.put_order(placed.clone()).unwrap();
        tx.commit().unwrap();

        let tx = store.begin().unwrap();
        assert_eq!(tx.order(&placed.id).unwrap(), Some(placed));
    }
}
