//! Catalog module.
//!
//! Products are a read-only dependency of the fulfillment core; inventory
//! rows and addresses are the other inputs checkout reads.

mod address;
mod inventory;
mod product;

pub use address::Address;
pub use inventory::{AdjustmentReason, InventoryAdjustment, InventoryLevel};
pub use product::Product;
