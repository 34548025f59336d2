//! Engine configuration.
//!
//! Loaded from TOML, or JSON when the file name ends in `.json`. Every
//! section is optional.
//!
//! ```toml
//! [cart]
//! max_quantity_per_line = 50
//!
//! [logging]
//! level = "debug"
//! format = "json"
//!
//! [[seed.products]]
//! id = "rust-book"
//! sku = "RUST-BOOK-001"
//! name = "Rust Programming Book"
//! price = 3000
//! stock = 10
//! ```

use chrono::{DateTime, Utc};
use fulfillment_core::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to render TOML config: {0}")]
    TomlRender(#[from] toml::ser::Error),

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentConfig {
    #[serde(default)]
    pub cart: CartConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Fixtures for an empty store.
    #[serde(default)]
    pub seed: SeedConfig,
}

impl FulfillmentConfig {
    /// Load config from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = if is_json(path) {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Save config to a file, in the format its extension names.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.render(is_json(path))?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn render(&self, json: bool) -> Result<String, ConfigError> {
        Ok(if json {
            serde_json::to_string_pretty(self)?
        } else {
            toml::to_string_pretty(self)?
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cart.max_quantity_per_line <= 0 {
            return Err(ConfigError::Invalid(format!(
                "cart.max_quantity_per_line must be positive, got {}",
                self.cart.max_quantity_per_line
            )));
        }
        for product in &self.seed.products {
            if product.stock < 0 {
                return Err(ConfigError::Invalid(format!(
                    "seed product {} has negative stock",
                    product.id
                )));
            }
        }
        Ok(())
    }

    /// A small catalog to start from.
    pub fn sample() -> Self {
        Self {
            seed: SeedConfig {
                products: vec![
                    SeedProduct::new("rust-book", "RUST-BOOK-001", "Rust Programming Book", 3000, 25),
                    SeedProduct::new("ferris-plush", "FERRIS-PLUSH", "Ferris Plush", 1500, 10),
                    SeedProduct::new("rust-mug", "RUST-MUG-01", "Rust Mug", 1000, 50),
                ],
                addresses: vec![SeedAddress {
                    id: AddressId::new("addr-home"),
                    user_id: UserId::new("alice"),
                    full_name: "Alice Example".into(),
                    address1: "1 Main St".into(),
                    address2: None,
                    city: "Springfield".into(),
                    province_code: Some("CA".into()),
                    country_code: "US".into(),
                    zip: "90000".into(),
                }],
                coupons: vec![SeedCoupon {
                    code: "SAVE10".into(),
                    kind: CouponKind::Percent,
                    value: 10,
                    min_order: None,
                    starts_at: None,
                    ends_at: None,
                    usage_limit: Some(100),
                    active: true,
                }],
            },
            ..Self::default()
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

/// Cart limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartConfig {
    #[serde(default = "default_max_quantity")]
    pub max_quantity_per_line: i64,
}

fn default_max_quantity() -> i64 {
    DEFAULT_MAX_QUANTITY_PER_LINE
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            max_quantity_per_line: default_max_quantity(),
        }
    }
}

/// Log output settings. `RUST_LOG` overrides `level`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedConfig {
    #[serde(default)]
    pub products: Vec<SeedProduct>,

    #[serde(default)]
    pub addresses: Vec<SeedAddress>,

    #[serde(default)]
    pub coupons: Vec<SeedCoupon>,
}

impl SeedConfig {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.addresses.is_empty() && self.coupons.is_empty()
    }
}

/// A product with its opening stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedProduct {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    /// Price in minor units.
    pub price: i64,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub stock: i64,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl SeedProduct {
    fn new(id: &str, sku: &str, name: &str, price: i64, stock: i64) -> Self {
        Self {
            id: ProductId::new(id),
            sku: sku.to_string(),
            name: name.to_string(),
            price,
            currency: Currency::USD,
            stock,
            active: true,
        }
    }

    pub fn to_product(&self, now: DateTime<Utc>) -> Product {
        let product = Product::new(
            self.id.clone(),
            self.sku.clone(),
            self.name.clone(),
            Money::new(self.price, self.currency),
            now,
        );
        if self.active {
            product
        } else {
            product.deactivated()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedAddress {
    pub id: AddressId,
    pub user_id: UserId,
    pub full_name: String,
    pub address1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province_code: Option<String>,
    pub country_code: String,
    pub zip: String,
}

impl From<SeedAddress> for Address {
    fn from(seed: SeedAddress) -> Self {
        let mut address = Address::new(
            seed.id,
            seed.user_id,
            seed.full_name,
            seed.address1,
            seed.city,
            seed.country_code,
            seed.zip,
        );
        address.address2 = seed.address2;
        address.province_code = seed.province_code;
        address
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedCoupon {
    pub code: String,
    pub kind: CouponKind,
    pub value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<i64>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl SeedCoupon {
    pub fn to_coupon(&self, now: DateTime<Utc>) -> Coupon {
        let mut coupon = match self.kind {
            CouponKind::Percent => Coupon::percent(self.code.clone(), self.value, now),
            CouponKind::Fixed => Coupon::fixed(self.code.clone(), self.value, now),
        }
        .with_window(self.starts_at, self.ends_at);
        coupon.min_order = self.min_order;
        coupon.usage_limit = self.usage_limit;
        coupon.active = self.active;
        coupon
    }
}

fn default_true() -> bool {
    true
}
