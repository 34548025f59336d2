//! Domain types for order fulfillment.
//!
//! This crate holds the entities and the pure rules of the fulfillment
//! workflow; the transactional orchestration lives in the `fulfillment`
//! crate.
//!
//! - **Catalog**: products, inventory rows, addresses
//! - **Cart**: carts with price-frozen lines, coupons
//! - **Checkout**: orders, frozen order items, the order status table
//! - **Payment / Shipment**: post-checkout records
//! - **Events**: cross-aggregate status effects
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use fulfillment_core::prelude::*;
//!
//! let product = Product::new(
//!     ProductId::new("rust-book"),
//!     "RUST-BOOK-001",
//!     "Rust Programming Book",
//!     Money::new(3000, Currency::USD),
//!     Utc::now(),
//! );
//!
//! let mut cart = Cart::new(UserId::new("user-1"), Utc::now());
//! cart.add_item(&product, 1, DEFAULT_MAX_QUANTITY_PER_LINE, Utc::now())?;
//!
//! let coupon = Coupon::percent("SAVE10", 10, Utc::now());
//! let discount = coupon.discount_for(cart.subtotal()?);
//! assert_eq!(discount.amount, 300);
//! # Ok::<(), FulfillmentError>(())
//! ```

pub mod clock;
pub mod error;
pub mod events;
pub mod ids;
pub mod money;
pub mod payment;
pub mod shipment;

pub mod cart;
pub mod catalog;
pub mod checkout;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::FulfillmentError;
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::error::FulfillmentError;
    pub use crate::events::{OrderEvent, StatusChange};
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Catalog
    pub use crate::catalog::{
        Address, AdjustmentReason, InventoryAdjustment, InventoryLevel, Product,
    };

    // Cart
    pub use crate::cart::{
        Cart, CartItem, CartStatus, Coupon, CouponCheck, CouponKind, CouponRejection,
        DEFAULT_MAX_QUANTITY_PER_LINE,
    };

    // Checkout
    pub use crate::checkout::{Order, OrderCoupon, OrderItem, OrderStatus};

    // Payment and shipment
    pub use crate::payment::{Payment, PaymentStatus};
    pub use crate::shipment::{NewShipment, Shipment, ShipmentStatus, ShipmentUpdate};
}
