//! Fulfill CLI - drive the order fulfillment engine from the command line.
//!
//! Commands:
//! - `fulfill scenario <file>` - Replay a scripted shopping scenario
//! - `fulfill race` - Hammer one product with concurrent checkouts
//! - `fulfill config` - Manage configuration

mod commands;
mod context;
mod logging;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{ConfigArgs, RaceArgs, ScenarioArgs};

/// Fulfill CLI - replay fulfillment scenarios against an in-memory store
#[derive(Parser)]
#[command(name = "fulfill")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario file step by step
    Scenario(ScenarioArgs),

    /// Run concurrent checkouts against one product
    Race(RaceArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let output = output::Output::new(cli.verbose, cli.json);

    let config_path = cli.config.as_deref();
    let ctx = context::Context::load(config_path, output)?;

    logging::init(&ctx.config.logging, cli.verbose)?;
    tracing::debug!(config = ?ctx.config_path, cwd = %ctx.cwd.display(), "context loaded");

    let result = match cli.command {
        Commands::Scenario(args) => commands::scenario::run(args, &ctx).await,
        Commands::Race(args) => commands::race::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
