//! CLI execution context.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use fulfillment::prelude::*;

use crate::output::Output;

/// Engine used by the CLI: in-memory store, clock the scenario can move.
pub type Engine = Fulfillment<MemoryStore, Arc<FixedClock>>;

const CONFIG_NAMES: [&str; 3] = ["fulfillment.toml", ".fulfillment.toml", "fulfillment.json"];

/// Execution context for CLI commands.
pub struct Context {
    /// Engine configuration.
    pub config: FulfillmentConfig,
    /// Where the configuration came from, if a file was found.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from config file.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let config_path = match config_path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::find_config(&cwd),
        };
        let config = match &config_path {
            Some(path) => FulfillmentConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => FulfillmentConfig::default(),
        };

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }

    /// Find a config file in the directory tree.
    fn find_config(start: &Path) -> Option<PathBuf> {
        start.ancestors().find_map(|dir| {
            CONFIG_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|path| path.is_file())
        })
    }

    /// A fresh engine seeded from the configuration.
    pub fn engine(&self) -> Result<Arc<Engine>> {
        let clock = Arc::new(FixedClock::new(chrono::Utc::now()));
        let engine = Fulfillment::with_clock(MemoryStore::new()?, clock).configured(&self.config);
        if !self.config.seed.is_empty() {
            engine
                .seed(&self.config.seed)
                .context("Failed to seed store from config")?;
            self.output.debug(&format!(
                "Seeded {} products, {} addresses, {} coupons",
                self.config.seed.products.len(),
                self.config.seed.addresses.len(),
                self.config.seed.coupons.len()
            ));
        }
        Ok(Arc::new(engine))
    }
}
