//! Transactional storage for order fulfillment.
//!
//! Every fulfillment operation runs inside one [`Transaction`]: all reads and
//! writes either commit together or roll back together. A transaction that is
//! dropped without [`Transaction::commit`] rolls back, so early returns via
//! `?` and panics leave the store untouched.
//!
//! Backends enforce the table invariants at write time:
//!
//! - inventory rows keep `quantity - reserved >= 0`
//! - a user has at most one ACTIVE cart
//! - orders satisfy `total == subtotal + shipping - discount`
//! - coupon codes are unique, an order has at most one coupon link
//!
//! [`MemoryStore`] keeps its tables in an in-memory redb database with rows
//! encoded as JSON.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use fulfillment_core::prelude::*;
//! use fulfillment_store::{MemoryStore, Store, Transaction};
//!
//! let store = MemoryStore::new()?;
//! let mut tx = store.begin()?;
//! tx.put_inventory(InventoryLevel::new(ProductId::new("p1"), 5, Utc::now()))?;
//! tx.commit()?;
//!
//! let tx = store.begin()?;
//! assert_eq!(tx.inventory(&ProductId::new("p1"))?.map(|l| l.available()), Some(5));
//! # Ok::<(), fulfillment_store::StoreError>(())
//! ```

mod error;
mod memory;

pub use error::StoreError;
pub use memory::{MemoryStore, MemoryTx};

use fulfillment_core::prelude::*;

/// A store that hands out transactions.
pub trait Store: Send + Sync {
    type Tx<'a>: Transaction
    where
        Self: 'a;

    /// Start a transaction. Backends may block until it can be serialized.
    fn begin(&self) -> Result<Self::Tx<'_>, StoreError>;
}

/// Reads and writes inside one atomic unit.
///
/// `put_*` methods insert or replace by primary key. Reads return owned
/// copies; changing a copy has no effect until it is written back.
pub trait Transaction {
    // Catalog
    fn product(&self, id: &ProductId) -> Result<Option<Product>, StoreError>;
    fn put_product(&mut self, product: Product) -> Result<(), StoreError>;

    fn address(&self, id: &AddressId) -> Result<Option<Address>, StoreError>;
    fn put_address(&mut self, address: Address) -> Result<(), StoreError>;

    // Inventory
    fn inventory(&self, product_id: &ProductId) -> Result<Option<InventoryLevel>, StoreError>;
    fn put_inventory(&mut self, level: InventoryLevel) -> Result<(), StoreError>;
    fn record_adjustment(&mut self, adjustment: InventoryAdjustment) -> Result<(), StoreError>;
    fn adjustments(&self, product_id: &ProductId) -> Result<Vec<InventoryAdjustment>, StoreError>;

    // Carts
    fn cart(&self, id: &CartId) -> Result<Option<Cart>, StoreError>;
    /// The user's most recently created ACTIVE cart.
    fn active_cart(&self, user_id: &UserId) -> Result<Option<Cart>, StoreError>;
    fn put_cart(&mut self, cart: Cart) -> Result<(), StoreError>;

    // Coupons
    fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError>;
    fn put_coupon(&mut self, coupon: Coupon) -> Result<(), StoreError>;

    // Orders
    fn order(&self, id: &OrderId) -> Result<Option<Order>, StoreError>;
    /// The user's orders, oldest first.
    fn orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, StoreError>;
    fn put_order(&mut self, order: Order) -> Result<(), StoreError>;
    fn order_coupon(&self, order_id: &OrderId) -> Result<Option<OrderCoupon>, StoreError>;
    /// Link a coupon to an order. Fails if the order already has one.
    fn insert_order_coupon(&mut self, link: OrderCoupon) -> Result<(), StoreError>;

    // Payments
    fn payment(&self, id: &PaymentId) -> Result<Option<Payment>, StoreError>;
    /// The order's payments, oldest first.
    fn payments_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, StoreError>;
    fn put_payment(&mut self, payment: Payment) -> Result<(), StoreError>;

    // Shipments
    fn shipment(&self, id: &ShipmentId) -> Result<Option<Shipment>, StoreError>;
    /// The order's shipments, oldest first.
    fn shipments_for_order(&self, order_id: &OrderId) -> Result<Vec<Shipment>, StoreError>;
    fn put_shipment(&mut self, shipment: Shipment) -> Result<(), StoreError>;

    /// Make every write of this transaction durable and visible.
    fn commit(self) -> Result<(), StoreError>;
}
