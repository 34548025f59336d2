//! Shared setup for the engine integration tests.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use fulfillment::prelude::*;
use std::sync::Arc;

pub type Engine = Fulfillment<MemoryStore, Arc<FixedClock>>;

pub struct Harness {
    pub engine: Engine,
    pub clock: Arc<FixedClock>,
    pub user: UserId,
    pub address: AddressId,
}

impl Harness {
    /// Engine with one user and one address owned by that user.
    pub fn new() -> Self {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ));
        let engine = Fulfillment::with_clock(MemoryStore::new().unwrap(), clock.clone());
        let user = UserId::new("alice");
        let address = AddressId::new("addr-alice");
        engine.register_address(address_for(&address, &user)).unwrap();
        Self {
            engine,
            clock,
            user,
            address,
        }
    }

    /// Register a USD product with opening stock.
    pub fn product(&self, id: &str, price: i64, stock: i64) -> ProductId {
        let product_id = ProductId::new(id);
        self.engine
            .register_product(Product::new(
                product_id.clone(),
                format!("SKU-{id}"),
                format!("Product {id}"),
                Money::new(price, Currency::USD),
                self.clock.now(),
            ))
            .unwrap();
        if stock > 0 {
            self.engine
                .adjust_inventory(&product_id, stock, AdjustmentReason::Restock)
                .unwrap();
        }
        product_id
    }

    pub fn request(&self) -> CheckoutRequest {
        CheckoutRequest::new(self.user.clone(), self.address.clone())
    }

    pub fn reserved(&self, product_id: &ProductId) -> i64 {
        self.engine.inventory(product_id).unwrap().unwrap().reserved
    }

    /// A PENDING order for one unit of a fresh product priced `price`.
    pub fn order(&self, price: i64) -> Order {
        let product_id = self.product("widget", price, 10);
        self.engine.add_item(&self.user, &product_id, 1).unwrap();
        self.engine.create_order(&self.request()).unwrap()
    }

    /// A PAID order with its captured payment.
    pub fn paid_order(&self, price: i64) -> (Order, Payment) {
        let order = self.order(price);
        let payment = self.engine.create_payment(&order.id, "stripe").unwrap();
        let outcome = self
            .engine
            .update_payment_status(&payment.id, PaymentStatus::Captured)
            .unwrap();
        let order = self.engine.order(&order.id).unwrap().order;
        (order, outcome.payment)
    }
}

pub fn address_for(id: &AddressId, user: &UserId) -> Address {
    Address::new(
        id.clone(),
        user.clone(),
        "Test User",
        "1 Main St",
        "Springfield",
        "US",
        "90000",
    )
}
