//! Scenario replay.
//!
//! A scenario is a TOML file with an optional `[seed]` section and a list of
//! `[[step]]` tables. Orders are referred to by a label chosen at checkout;
//! `pay`, `ship` and friends act on the latest payment or shipment created
//! for that label.
//!
//! ```toml
//! [[step]]
//! action = "add"
//! user = "alice"
//! product = "rust-book"
//! quantity = 2
//!
//! [[step]]
//! action = "checkout"
//! user = "alice"
//! address = "addr-home"
//! coupon = "SAVE10"
//! order = "first"
//!
//! [[step]]
//! action = "ship"
//! order = "first"
//! expect = "PAYMENT_REQUIRED"
//! ```

use std::collections::HashMap;

use anyhow::{anyhow, bail, Context as _, Result};
use fulfillment::prelude::*;
use serde::{Deserialize, Serialize};

use super::ScenarioArgs;
use crate::context::{Context, Engine};
use crate::output::status_badge;

/// Run the scenario command.
pub async fn run(args: ScenarioArgs, ctx: &Context) -> Result<()> {
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read scenario: {}", args.file.display()))?;
    let scenario: Scenario = toml::from_str(&content)
        .with_context(|| format!("Failed to parse scenario: {}", args.file.display()))?;

    let engine = ctx.engine()?;
    if !scenario.seed.is_empty() {
        engine
            .seed(&scenario.seed)
            .context("Failed to apply scenario seed")?;
    }

    let title = scenario
        .name
        .clone()
        .unwrap_or_else(|| args.file.display().to_string());
    ctx.output.header(&format!("Scenario: {}", title));

    let mut replay = Replay::new(&engine);
    let total = scenario.steps.len();
    for (index, step) in scenario.steps.iter().enumerate() {
        let report = replay.step(index + 1, step)?;
        let line = format!("{:<9} {}", report.action, report.detail);
        ctx.output.step(report.index, total, &line);
        if !report.passed {
            ctx.output.warn(&format!(
                "step {} expected {} but got {}",
                report.index,
                report.expected.as_deref().unwrap_or("success"),
                report.kind.unwrap_or("success"),
            ));
        }
        let stop = args.fail_fast && !report.passed;
        replay.reports.push(report);
        if stop {
            break;
        }
    }

    if ctx.output.is_json() {
        ctx.output.json(&replay.reports);
    } else {
        print_orders(ctx, &replay)?;
    }

    let failed = replay.reports.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        bail!("{} of {} step(s) did not match expectations", failed, total);
    }
    ctx.output.success(&format!("{} step(s) replayed", replay.reports.len()));
    Ok(())
}

fn print_orders(ctx: &Context, replay: &Replay<'_>) -> Result<()> {
    if replay.orders.is_empty() {
        return Ok(());
    }
    ctx.output.header("Orders");
    let mut labels: Vec<_> = replay.orders.iter().collect();
    labels.sort();
    for (label, order_id) in labels {
        let details = replay.engine.order(order_id)?;
        ctx.output.kv(
            label,
            &format!(
                "{} {} total {} captured {} refunded {}",
                details.order.order_number,
                status_badge(details.order.status.as_str()),
                details.order.total,
                details.captured_total()?,
                details.refunded_total()?,
            ),
        );
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    seed: SeedConfig,

    #[serde(default, rename = "step")]
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
struct Step {
    #[serde(flatten)]
    action: Action,

    /// Error kind the step must be rejected with.
    #[serde(default)]
    expect: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Action {
    Add {
        user: String,
        product: String,
        #[serde(default = "default_quantity")]
        quantity: i64,
    },
    Remove {
        user: String,
        product: String,
    },
    Restock {
        product: String,
        quantity: i64,
    },
    Checkout {
        user: String,
        address: String,
        #[serde(default)]
        billing: Option<String>,
        #[serde(default)]
        coupon: Option<String>,
        order: String,
    },
    Pay {
        order: String,
        #[serde(default = "default_provider")]
        provider: String,
    },
    Capture {
        order: String,
    },
    Fail {
        order: String,
    },
    Refund {
        order: String,
    },
    Status {
        order: String,
        to: String,
    },
    Cancel {
        order: String,
    },
    Ship {
        order: String,
        #[serde(default)]
        carrier: Option<String>,
        #[serde(default)]
        tracking_number: Option<String>,
    },
    Transit {
        order: String,
    },
    Deliver {
        order: String,
    },
    Advance {
        #[serde(default)]
        hours: i64,
        #[serde(default)]
        minutes: i64,
    },
}

fn default_quantity() -> i64 {
    1
}

fn default_provider() -> String {
    "stripe".to_string()
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::Add { .. } => "add",
            Action::Remove { .. } => "remove",
            Action::Restock { .. } => "restock",
            Action::Checkout { .. } => "checkout",
            Action::Pay { .. } => "pay",
            Action::Capture { .. } => "capture",
            Action::Fail { .. } => "fail",
            Action::Refund { .. } => "refund",
            Action::Status { .. } => "status",
            Action::Cancel { .. } => "cancel",
            Action::Ship { .. } => "ship",
            Action::Transit { .. } => "transit",
            Action::Deliver { .. } => "deliver",
            Action::Advance { .. } => "advance",
        }
    }
}

/// What happened at one step.
#[derive(Debug, Serialize)]
struct StepReport {
    index: usize,
    action: &'static str,
    detail: String,
    kind: Option<&'static str>,
    expected: Option<String>,
    passed: bool,
}

/// Replay state: the engine plus the labels assigned so far.
struct Replay<'e> {
    engine: &'e Engine,
    orders: HashMap<String, OrderId>,
    payments: HashMap<String, PaymentId>,
    shipments: HashMap<String, ShipmentId>,
    reports: Vec<StepReport>,
}

impl<'e> Replay<'e> {
    fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            orders: HashMap::new(),
            payments: HashMap::new(),
            shipments: HashMap::new(),
            reports: Vec::new(),
        }
    }

    /// Apply one step. Engine rejections are part of the report; script
    /// mistakes such as an unknown label abort the replay.
    fn step(&mut self, index: usize, step: &Step) -> Result<StepReport> {
        let outcome = self
            .apply(&step.action)
            .with_context(|| format!("step {} ({})", index, step.action.name()))?;
        let (detail, kind) = match outcome {
            Ok(detail) => (detail, None),
            Err(err) => (err.to_string(), Some(err.kind())),
        };
        let passed = match (&step.expect, kind) {
            (None, None) => true,
            (Some(expected), Some(kind)) => expected.eq_ignore_ascii_case(kind),
            _ => false,
        };
        Ok(StepReport {
            index,
            action: step.action.name(),
            detail,
            kind,
            expected: step.expect.clone(),
            passed,
        })
    }

    fn apply(&mut self, action: &Action) -> Result<Result<String, FulfillmentError>> {
        let engine = self.engine;
        Ok(match action {
            Action::Add {
                user,
                product,
                quantity,
            } => engine
                .add_item(&UserId::new(user.as_str()), &ProductId::new(product.as_str()), *quantity)
                .map(|cart| describe_cart(&cart)),
            Action::Remove { user, product } => {
                let user_id = UserId::new(user.as_str());
                let cart = engine.active_cart(&user_id)?;
                let line = cart
                    .get_item_by_product(&ProductId::new(product.as_str()))
                    .ok_or_else(|| anyhow!("{} has no {} in the cart", user, product))?;
                engine
                    .remove_item(&user_id, &line.id)
                    .map(|cart| describe_cart(&cart))
            }
            Action::Restock { product, quantity } => engine
                .adjust_inventory(&ProductId::new(product.as_str()), *quantity, AdjustmentReason::Restock)
                .map(|level| {
                    format!(
                        "{} stock {} reserved {} available {}",
                        level.product_id,
                        level.quantity,
                        level.reserved,
                        level.available()
                    )
                }),
            Action::Checkout {
                user,
                address,
                billing,
                coupon,
                order,
            } => {
                let mut request = CheckoutRequest::new(UserId::new(user.as_str()), AddressId::new(address.as_str()));
                if let Some(billing) = billing {
                    request.billing_address_id = AddressId::new(billing.as_str());
                }
                if let Some(code) = coupon {
                    request = request.with_coupon(code.as_str());
                }
                engine.create_order(&request).map(|placed| {
                    let detail = format!(
                        "{} placed as {} total {} (discount {})",
                        order, placed.order_number, placed.total, placed.discount
                    );
                    self.orders.insert(order.clone(), placed.id);
                    detail
                })
            }
            Action::Pay { order, provider } => {
                let order_id = self.order_id(order)?;
                engine.create_payment(&order_id, provider).map(|payment| {
                    let detail = format!("{} {} via {}", payment.id, payment.amount, payment.provider);
                    self.payments.insert(order.clone(), payment.id);
                    detail
                })
            }
            Action::Capture { order } => self.set_payment(order, PaymentStatus::Captured)?,
            Action::Fail { order } => self.set_payment(order, PaymentStatus::Failed)?,
            Action::Refund { order } => self.set_payment(order, PaymentStatus::Refunded)?,
            Action::Status { order, to } => {
                let to = OrderStatus::parse(to).ok_or_else(|| anyhow!("unknown order status {}", to))?;
                self.set_order(order, to)?
            }
            Action::Cancel { order } => self.set_order(order, OrderStatus::Cancelled)?,
            Action::Ship {
                order,
                carrier,
                tracking_number,
            } => {
                let order_id = self.order_id(order)?;
                let details = NewShipment {
                    carrier: carrier.clone(),
                    tracking_number: tracking_number.clone(),
                    tracking_url: None,
                };
                engine.create_shipment(&order_id, details).map(|shipment| {
                    let detail = format!(
                        "{} via {}",
                        shipment.id,
                        shipment.carrier.as_deref().unwrap_or("unknown carrier")
                    );
                    self.shipments.insert(order.clone(), shipment.id);
                    detail
                })
            }
            Action::Transit { order } => self.set_shipment(order, ShipmentStatus::InTransit)?,
            Action::Deliver { order } => self.set_shipment(order, ShipmentStatus::Delivered)?,
            Action::Advance { hours, minutes } => {
                engine
                    .clock()
                    .advance(chrono::Duration::hours(*hours) + chrono::Duration::minutes(*minutes));
                Ok(format!("clock at {}", engine.clock().now().to_rfc3339()))
            }
        })
    }

    fn order_id(&self, label: &str) -> Result<OrderId> {
        self.orders
            .get(label)
            .cloned()
            .ok_or_else(|| anyhow!("no order labelled {}", label))
    }

    fn set_order(&self, label: &str, to: OrderStatus) -> Result<Result<String, FulfillmentError>> {
        let order_id = self.order_id(label)?;
        Ok(self
            .engine
            .update_order_status(&order_id, to)
            .map(|order| format!("{} now {}", label, status_badge(order.status.as_str()))))
    }

    fn set_payment(
        &self,
        label: &str,
        to: PaymentStatus,
    ) -> Result<Result<String, FulfillmentError>> {
        let payment_id = self
            .payments
            .get(label)
            .ok_or_else(|| anyhow!("no payment for order {}", label))?;
        Ok(self
            .engine
            .update_payment_status(payment_id, to)
            .map(|outcome| {
                describe_change(
                    format!("{} {}", outcome.payment.id, status_badge(outcome.payment.status.as_str())),
                    outcome.order_change.as_ref(),
                )
            }))
    }

    fn set_shipment(
        &self,
        label: &str,
        to: ShipmentStatus,
    ) -> Result<Result<String, FulfillmentError>> {
        let shipment_id = self
            .shipments
            .get(label)
            .ok_or_else(|| anyhow!("no shipment for order {}", label))?;
        Ok(self
            .engine
            .update_shipment(shipment_id, ShipmentUpdate::status(to))
            .map(|outcome| {
                describe_change(
                    format!(
                        "{} {}",
                        outcome.shipment.id,
                        status_badge(outcome.shipment.status.as_str())
                    ),
                    outcome.order_change.as_ref(),
                )
            }))
    }
}

fn describe_cart(cart: &Cart) -> String {
    match cart.subtotal() {
        Ok(subtotal) => format!(
            "{} cart holds {} item(s), subtotal {}",
            cart.user_id,
            cart.item_count(),
            subtotal
        ),
        Err(_) => format!("{} cart holds {} item(s)", cart.user_id, cart.item_count()),
    }
}

fn describe_change(head: String, change: Option<&StatusChange>) -> String {
    match change {
        Some(change) => format!(
            "{}, order {} -> {} on {}",
            head,
            change.from,
            change.to,
            change.cause.name()
        ),
        None => head,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn engine() -> Engine {
        let engine = Fulfillment::with_clock(
            MemoryStore::new().unwrap(),
            Arc::new(FixedClock::new(chrono::Utc::now())),
        );
        engine
            .seed(&FulfillmentConfig::sample().seed)
            .unwrap();
        engine
    }

    fn replay_all(engine: &Engine, source: &str) -> Vec<StepReport> {
        let scenario: Scenario = toml::from_str(source).unwrap();
        let mut replay = Replay::new(engine);
        scenario
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| replay.step(i + 1, step).unwrap())
            .collect()
    }

    #[test]
    fn test_happy_path_scenario() {
        let engine = engine();
        let reports = replay_all(
            &engine,
            r#"
            [[step]]
            action = "add"
            user = "alice"
            product = "rust-book"

            [[step]]
            action = "checkout"
            user = "alice"
            address = "addr-home"
            coupon = "SAVE10"
            order = "first"

            [[step]]
            action = "ship"
            order = "first"
            expect = "PAYMENT_REQUIRED"

            [[step]]
            action = "pay"
            order = "first"

            [[step]]
            action = "capture"
            order = "first"

            [[step]]
            action = "ship"
            order = "first"
            carrier = "ups"

            [[step]]
            action = "deliver"
            order = "first"
            "#,
        );

        assert_eq!(reports.len(), 7);
        assert!(reports.iter().all(|r| r.passed), "{:?}", reports);
        assert_eq!(reports[2].kind, Some("PAYMENT_REQUIRED"));

        let orders = engine.orders_for_user(&UserId::new("alice")).unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Delivered);
        assert_eq!(orders[0].total.amount, 2700);
    }

    #[test]
    fn test_unexpected_rejection_fails_step() {
        let engine = engine();
        let reports = replay_all(
            &engine,
            r#"
            [[step]]
            action = "add"
            user = "alice"
            product = "ferris-plush"
            quantity = 11

            [[step]]
            action = "checkout"
            user = "alice"
            address = "addr-home"
            order = "big"
            "#,
        );

        assert!(reports[0].passed);
        assert!(!reports[1].passed);
        assert_eq!(reports[1].kind, Some("INSUFFICIENT_STOCK"));
    }

    #[test]
    fn test_unknown_label_aborts() {
        let engine = engine();
        let scenario: Scenario = toml::from_str(
            r#"
            [[step]]
            action = "capture"
            order = "missing"
            "#,
        )
        .unwrap();
        let mut replay = Replay::new(&engine);
        assert!(replay.step(1, &scenario.steps[0]).is_err());
    }
}
