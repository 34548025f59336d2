//! Configuration management commands.

use std::path::Path;

use anyhow::{bail, Context as _, Result};
use fulfillment::FulfillmentConfig;

use super::{ConfigArgs, ConfigCommand};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Init { path, force, bare } => init_config(&path, force, bare, ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("source", &path.display().to_string()),
        None => ctx.output.kv("source", "built-in defaults"),
    }

    ctx.output.info("[cart]");
    ctx.output.kv(
        "max_quantity_per_line",
        &ctx.config.cart.max_quantity_per_line.to_string(),
    );

    ctx.output.info("[logging]");
    ctx.output.kv("level", &ctx.config.logging.level);
    ctx.output.kv("format", &format!("{:?}", ctx.config.logging.format).to_lowercase());

    let seed = &ctx.config.seed;
    if !seed.is_empty() {
        ctx.output.info("[seed]");
        for product in &seed.products {
            ctx.output.list_item(&format!(
                "product {} ({}) price {} stock {}",
                product.id, product.sku, product.price, product.stock
            ));
        }
        for address in &seed.addresses {
            ctx.output
                .list_item(&format!("address {} for {}", address.id, address.user_id));
        }
        for coupon in &seed.coupons {
            ctx.output
                .list_item(&format!("coupon {} {:?} {}", coupon.code, coupon.kind, coupon.value));
        }
    }

    Ok(())
}

async fn init_config(path: &Path, force: bool, bare: bool, ctx: &Context) -> Result<()> {
    let path = ctx.cwd.join(path);
    if path.exists() && !force {
        bail!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        );
    }

    let config = if bare {
        FulfillmentConfig::default()
    } else {
        FulfillmentConfig::sample()
    };
    config
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    ctx.output.success(&format!("Created {}", path.display()));
    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    ctx.config.validate().context("Configuration is invalid")?;
    ctx.output.success("Configuration is valid");
    Ok(())
}
