//! CLI command implementations.

pub mod config;
pub mod race;
pub mod scenario;

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Arguments for the scenario command.
#[derive(Args)]
pub struct ScenarioArgs {
    /// Scenario file (TOML).
    pub file: PathBuf,

    /// Stop at the first step whose outcome differs from its expectation.
    #[arg(long)]
    pub fail_fast: bool,
}

/// Arguments for the race command.
#[derive(Args)]
pub struct RaceArgs {
    /// Number of concurrent shoppers.
    #[arg(short, long, default_value_t = 32)]
    pub shoppers: usize,

    /// Units in stock before the race starts.
    #[arg(long, default_value_t = 10)]
    pub stock: i64,

    /// Units each shopper tries to buy.
    #[arg(short, long, default_value_t = 1)]
    pub quantity: i64,

    /// Unit price in minor units.
    #[arg(long, default_value_t = 1999)]
    pub price: i64,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,

    /// Write a configuration file with sample seed data.
    Init {
        /// Output path (`.json` selects JSON).
        #[arg(default_value = "fulfillment.toml")]
        path: PathBuf,

        /// Overwrite existing config.
        #[arg(short, long)]
        force: bool,

        /// Leave the seed section empty.
        #[arg(long)]
        bare: bool,
    },

    /// Validate the loaded configuration.
    Validate,
}
