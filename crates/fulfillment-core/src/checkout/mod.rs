//! Checkout module.
//!
//! Orders produced by checkout and the status machine that governs them.

mod order;
mod status;

pub use order::{Order, OrderCoupon, OrderItem};
pub use status::OrderStatus;
