//! `notaryd` - the notary daemon.
//!
//! Serves `notary.Notary` and `notary.Sync` as an authority, or forwards
//! `notary.Notary` to an upstream authority as a proxy, and periodically
//! pulls grants from configured peers.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod node;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use notary_config::Config;
use notary_telemetry::{LogConfig, setup_logging};

/// Notary daemon - credential authority and grant replication.
#[derive(Parser)]
#[command(name = "notaryd")]
#[command(author, version, about = "Notary daemon - credential authority and grant replication")]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, env = "NOTARY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("failed to load configuration")?;

    let mut log_config = LogConfig::from_section(&config.logging);
    if args.verbose {
        log_config.level = "debug".to_owned();
    }
    if let Err(e) = setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let node = node::Node::start(&config).await?;
    println!(
        "{}",
        format!("notaryd listening on {} (mode: {})", node.addr(), node.mode())
            .cyan()
            .bold()
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    println!("\n{}", "Shutting down notaryd...".yellow());
    node.stop().await
}
