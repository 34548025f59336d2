//! Concurrent checkout race against a single product.

use std::collections::BTreeMap;

use anyhow::{bail, Context as _, Result};
use fulfillment::prelude::*;
use serde::Serialize;
use tokio::task::JoinHandle;

use super::RaceArgs;
use crate::context::Context;

const RACE_PRODUCT: &str = "race-item";

#[derive(Debug, Serialize)]
struct RaceSummary {
    shoppers: usize,
    placed: usize,
    rejected: BTreeMap<&'static str, usize>,
    stock: i64,
    reserved: i64,
    available: i64,
}

/// Run the race command.
pub async fn run(args: RaceArgs, ctx: &Context) -> Result<()> {
    if args.shoppers == 0 || args.stock < 0 || args.quantity <= 0 {
        bail!("shoppers and quantity must be positive and stock non-negative");
    }

    let engine = ctx.engine()?;
    let product_id = ProductId::new(RACE_PRODUCT);
    let now = engine.clock().now();
    engine.register_product(Product::new(
        product_id.clone(),
        "RACE-001",
        "Race Item",
        Money::new(args.price, Currency::USD),
        now,
    ))?;
    // A zero delta still opens the inventory row.
    engine.adjust_inventory(&product_id, args.stock, AdjustmentReason::Restock)?;

    let mut requests = Vec::with_capacity(args.shoppers);
    for n in 0..args.shoppers {
        let user_id = UserId::new(format!("shopper-{n}"));
        let address_id = AddressId::new(format!("addr-shopper-{n}"));
        engine.register_address(Address::new(
            address_id.clone(),
            user_id.clone(),
            format!("Shopper {n}"),
            "1 Race Way",
            "Springfield",
            "US",
            "90000",
        ))?;
        engine.add_item(&user_id, &product_id, args.quantity)?;
        requests.push(CheckoutRequest::new(user_id, address_id));
    }

    ctx.output.info(&format!(
        "{} shoppers racing for {} unit(s) of {}",
        args.shoppers, args.stock, RACE_PRODUCT
    ));
    let pb = ctx.output.progress(args.shoppers as u64, "checking out");

    let handles: Vec<JoinHandle<Result<Order, FulfillmentError>>> = requests
        .into_iter()
        .map(|request| {
            let engine = engine.clone();
            tokio::task::spawn_blocking(move || engine.create_order(&request))
        })
        .collect();

    let mut placed = 0;
    let mut rejected: BTreeMap<&'static str, usize> = BTreeMap::new();
    for handle in handles {
        match handle.await.context("Checkout task panicked")? {
            Ok(_) => placed += 1,
            Err(err) => *rejected.entry(err.kind()).or_default() += 1,
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let level = engine
        .inventory(&product_id)?
        .context("Inventory row disappeared")?;
    let summary = RaceSummary {
        shoppers: args.shoppers,
        placed,
        rejected,
        stock: level.quantity,
        reserved: level.reserved,
        available: level.available(),
    };

    if ctx.output.is_json() {
        ctx.output.json(&summary);
    } else {
        ctx.output.header("Race Results");
        ctx.output.kv("placed", &summary.placed.to_string());
        for (kind, count) in &summary.rejected {
            ctx.output.kv(&format!("rejected {}", kind), &count.to_string());
        }
        ctx.output.kv("stock", &summary.stock.to_string());
        ctx.output.kv("reserved", &summary.reserved.to_string());
        ctx.output.kv("available", &summary.available.to_string());
    }

    let expected_reserved = summary.placed as i64 * args.quantity;
    if summary.reserved != expected_reserved || summary.reserved > summary.stock {
        bail!(
            "Oversold: {} order(s) of {} reserve {} against stock {}",
            summary.placed,
            args.quantity,
            summary.reserved,
            summary.stock
        );
    }
    ctx.output
        .success("Reservations match placed orders and never exceed stock");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Output;

    fn ctx() -> Context {
        Context {
            config: FulfillmentConfig::default(),
            config_path: None,
            output: Output::new(false, true),
            cwd: std::env::temp_dir(),
        }
    }

    fn args(shoppers: usize, stock: i64) -> RaceArgs {
        RaceArgs {
            shoppers,
            stock,
            quantity: 1,
            price: 1999,
        }
    }

    #[tokio::test]
    async fn test_race_without_stock_rejects_everyone() {
        run(args(4, 0), &ctx()).await.unwrap();
    }

    #[tokio::test]
    async fn test_race_places_at_most_stock() {
        run(args(8, 3), &ctx()).await.unwrap();
    }

    #[tokio::test]
    async fn test_race_rejects_negative_stock() {
        assert!(run(args(4, -1), &ctx()).await.is_err());
    }
}
