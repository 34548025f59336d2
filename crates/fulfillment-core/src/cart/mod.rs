//! Shopping cart module.
//!
//! Contains the cart, its lines and the coupons that can discount a checkout.

mod cart;
mod coupon;

pub use cart::{Cart, CartItem, CartStatus, DEFAULT_MAX_QUANTITY_PER_LINE};
pub use coupon::{Coupon, CouponCheck, CouponKind, CouponRejection};
