//! Order fulfillment engine.
//!
//! [`Fulfillment`] is the entry point. Each operation runs in one store
//! transaction that commits on success and rolls back on any error:
//!
//! - **Inventory ledger**: stock reservation, release and adjustment
//! - **Coupon ledger**: validation, discounts, usage accounting
//! - **Cart manager**: one ACTIVE cart per user, price-frozen lines
//! - **Checkout**: cart to PENDING order in one atomic step
//! - **Order status machine**: transition table plus payment/shipment events
//! - **Payment ledger** and **shipment tracker**
//!
//! The per-module functions are generic over [`Transaction`] and can be
//! composed inside a caller's own transaction.
//!
//! # Example
//!
//! ```rust
//! use fulfillment::prelude::*;
//!
//! let engine = Fulfillment::new(MemoryStore::new()?);
//! engine.seed(&FulfillmentConfig::sample().seed)?;
//!
//! let alice = UserId::new("alice");
//! engine.add_item(&alice, &ProductId::new("rust-book"), 1)?;
//!
//! let order = engine.create_order(
//!     &CheckoutRequest::new(alice, AddressId::new("addr-home")).with_coupon("SAVE10"),
//! )?;
//! assert_eq!(order.total.amount, 2700);
//! # Ok::<(), FulfillmentError>(())
//! ```

pub mod carts;
pub mod checkout;
pub mod config;
pub mod coupons;
pub mod inventory;
pub mod orders;
pub mod payments;
pub mod shipments;

pub use checkout::CheckoutRequest;
pub use config::{ConfigError, FulfillmentConfig, LogFormat, LoggingConfig, SeedConfig};
pub use orders::OrderDetails;
pub use payments::PaymentOutcome;
pub use shipments::ShipmentOutcome;

use chrono::{DateTime, Utc};
use fulfillment_core::prelude::*;
use fulfillment_store::{Store, Transaction};
use tracing::{error, info, instrument, warn};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        CheckoutRequest, ConfigError, Fulfillment, FulfillmentConfig, LogFormat, LoggingConfig,
        OrderDetails, PaymentOutcome, SeedConfig, ShipmentOutcome,
    };
    pub use fulfillment_core::prelude::*;
    pub use fulfillment_store::{MemoryStore, Store, StoreError, Transaction};
}

/// Fulfillment engine over a store and a clock.
pub struct Fulfillment<S: Store, C: Clock = SystemClock> {
    store: S,
    clock: C,
    max_quantity_per_line: i64,
}

impl<S: Store> Fulfillment<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: Store, C: Clock> Fulfillment<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            max_quantity_per_line: DEFAULT_MAX_QUANTITY_PER_LINE,
        }
    }

    /// Apply cart limits from configuration.
    pub fn configured(mut self, config: &FulfillmentConfig) -> Self {
        self.max_quantity_per_line = config.cart.max_quantity_per_line;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Run `op` in a transaction and commit if it succeeds.
    fn write<'s, R>(
        &'s self,
        op: impl FnOnce(&mut S::Tx<'s>, DateTime<Utc>) -> Result<R, FulfillmentError>,
    ) -> Result<R, FulfillmentError> {
        let mut tx = self.store.begin()?;
        let value = op(&mut tx, self.clock.now()).inspect_err(log_rejection)?;
        tx.commit()?;
        Ok(value)
    }

    /// Run `op` in a transaction that is never committed.
    fn read<'s, R>(
        &'s self,
        op: impl FnOnce(&S::Tx<'s>, DateTime<Utc>) -> Result<R, FulfillmentError>,
    ) -> Result<R, FulfillmentError> {
        let tx = self.store.begin()?;
        op(&tx, self.clock.now()).inspect_err(log_rejection)
    }

    // ---- Catalog and seeding -------------------------------------------

    /// Add or replace a product. Stock is managed through [`Self::adjust_inventory`].
    #[instrument(skip_all, fields(product_id = %product.id))]
    pub fn register_product(&self, product: Product) -> Result<Product, FulfillmentError> {
        self.write(|tx, _| {
            tx.put_product(product.clone())?;
            Ok(product)
        })
    }

    #[instrument(skip_all, fields(address_id = %address.id, user_id = %address.user_id))]
    pub fn register_address(&self, address: Address) -> Result<Address, FulfillmentError> {
        self.write(|tx, _| {
            tx.put_address(address.clone())?;
            Ok(address)
        })
    }

    /// Load fixtures in a single transaction.
    #[instrument(skip_all, fields(
        products = seed.products.len(),
        addresses = seed.addresses.len(),
        coupons = seed.coupons.len(),
    ))]
    pub fn seed(&self, seed: &SeedConfig) -> Result<(), FulfillmentError> {
        self.write(|tx, now| {
            for product in &seed.products {
                tx.put_product(product.to_product(now))?;
                inventory::adjust(tx, &product.id, product.stock, AdjustmentReason::Restock, now)?;
            }
            for address in &seed.addresses {
                tx.put_address(address.clone().into())?;
            }
            for coupon in &seed.coupons {
                coupons::create(tx, coupon.to_coupon(now))?;
            }
            Ok(())
        })?;
        info!("store seeded");
        Ok(())
    }

    // ---- Inventory -----------------------------------------------------

    pub fn inventory(&self, product_id: &ProductId) -> Result<Option<InventoryLevel>, FulfillmentError> {
        self.read(|tx, _| inventory::level(tx, product_id))
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    pub fn adjust_inventory(
        &self,
        product_id: &ProductId,
        delta: i64,
        reason: AdjustmentReason,
    ) -> Result<InventoryLevel, FulfillmentError> {
        self.write(|tx, now| inventory::adjust(tx, product_id, delta, reason, now))
    }

    pub fn inventory_history(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<InventoryAdjustment>, FulfillmentError> {
        self.read(|tx, _| inventory::history(tx, product_id))
    }

    // ---- Coupons -------------------------------------------------------

    /// Check a code against a candidate subtotal in minor units.
    pub fn validate_coupon(&self, code: &str, subtotal: i64) -> Result<CouponCheck, FulfillmentError> {
        self.read(|tx, now| coupons::validate(tx, code, subtotal, now))
    }

    pub fn coupon(&self, code: &str) -> Result<Option<Coupon>, FulfillmentError> {
        self.read(|tx, _| Ok(tx.coupon_by_code(code)?))
    }

    #[instrument(skip_all, fields(code = %coupon.code))]
    pub fn create_coupon(&self, coupon: Coupon) -> Result<Coupon, FulfillmentError> {
        self.write(|tx, _| coupons::create(tx, coupon))
    }

    // ---- Carts ---------------------------------------------------------

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn active_cart(&self, user_id: &UserId) -> Result<Cart, FulfillmentError> {
        self.write(|tx, now| carts::get_or_create_active(tx, user_id, now))
    }

    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub fn add_item(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Cart, FulfillmentError> {
        let max = self.max_quantity_per_line;
        self.write(|tx, now| carts::add_item(tx, user_id, product_id, quantity, max, now))
    }

    #[instrument(skip(self), fields(user_id = %user_id, line_item_id = %line_item_id))]
    pub fn update_item(
        &self,
        user_id: &UserId,
        line_item_id: &CartItemId,
        quantity: i64,
    ) -> Result<Cart, FulfillmentError> {
        let max = self.max_quantity_per_line;
        self.write(|tx, now| carts::update_item(tx, user_id, line_item_id, quantity, max, now))
    }

    #[instrument(skip(self), fields(user_id = %user_id, line_item_id = %line_item_id))]
    pub fn remove_item(
        &self,
        user_id: &UserId,
        line_item_id: &CartItemId,
    ) -> Result<Cart, FulfillmentError> {
        self.write(|tx, now| carts::remove_item(tx, user_id, line_item_id, now))
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn abandon_cart(&self, user_id: &UserId) -> Result<Cart, FulfillmentError> {
        self.write(|tx, now| carts::abandon(tx, user_id, now))
    }

    // ---- Orders --------------------------------------------------------

    #[instrument(skip_all, fields(
        user_id = %request.user_id,
        coupon = request.coupon_code.as_deref(),
        order_id = tracing::field::Empty,
    ))]
    pub fn create_order(&self, request: &CheckoutRequest) -> Result<Order, FulfillmentError> {
        let order = self.write(|tx, now| checkout::create_order(tx, request, now))?;
        tracing::Span::current().record("order_id", tracing::field::display(&order.id));
        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %order_id, to = %to))]
    pub fn update_order_status(
        &self,
        order_id: &OrderId,
        to: OrderStatus,
    ) -> Result<Order, FulfillmentError> {
        self.write(|tx, now| orders::update_status(tx, order_id, to, now))
    }

    pub fn order(&self, order_id: &OrderId) -> Result<OrderDetails, FulfillmentError> {
        self.read(|tx, _| orders::details(tx, order_id))
    }

    pub fn orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, FulfillmentError> {
        self.read(|tx, _| Ok(tx.orders_for_user(user_id)?))
    }

    // ---- Payments ------------------------------------------------------

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub fn create_payment(&self, order_id: &OrderId, provider: &str) -> Result<Payment, FulfillmentError> {
        self.write(|tx, now| payments::create(tx, order_id, provider, now))
    }

    #[instrument(skip(self), fields(payment_id = %payment_id, to = %to))]
    pub fn update_payment_status(
        &self,
        payment_id: &PaymentId,
        to: PaymentStatus,
    ) -> Result<PaymentOutcome, FulfillmentError> {
        self.write(|tx, now| payments::update_status(tx, payment_id, to, now))
    }

    pub fn payments_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, FulfillmentError> {
        self.read(|tx, _| payments::for_order(tx, order_id))
    }

    // ---- Shipments -----------------------------------------------------

    #[instrument(skip(self, details), fields(order_id = %order_id))]
    pub fn create_shipment(
        &self,
        order_id: &OrderId,
        details: NewShipment,
    ) -> Result<Shipment, FulfillmentError> {
        self.write(|tx, now| shipments::create(tx, order_id, details, now))
    }

    #[instrument(skip(self, changes), fields(shipment_id = %shipment_id, status = ?changes.status))]
    pub fn update_shipment(
        &self,
        shipment_id: &ShipmentId,
        changes: ShipmentUpdate,
    ) -> Result<ShipmentOutcome, FulfillmentError> {
        self.write(|tx, now| shipments::update(tx, shipment_id, changes, now))
    }

    pub fn shipments_for_order(&self, order_id: &OrderId) -> Result<Vec<Shipment>, FulfillmentError> {
        self.read(|tx, _| shipments::for_order(tx, order_id))
    }
}

fn log_rejection(err: &FulfillmentError) {
    if err.is_business_rule() {
        warn!(kind = err.kind(), error = %err, "operation rejected");
    } else {
        error!(error = %err, "operation failed");
    }
}
