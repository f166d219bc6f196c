// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! partix - partition routing, pruning and on-demand creation

mod commands;
mod config;
mod output;
mod predicate;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{drop, init, prune, route, show, Env};
use config::CliConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "partix",
    version,
    about = "partix - range and hash partition routing with on-demand partition creation"
)]
struct Cli {
    /// Config file (defaults to ./partix.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Registry WAL, overriding the config file
    #[arg(long, global = true)]
    wal: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Partition a relation
    Init(init::InitArgs),
    /// Print the partition receiving a key, creating it if needed
    Route(route::RouteArgs),
    /// Print the partitions a filter can match
    Prune(prune::PruneArgs),
    /// List a relation's partitions
    Show(show::ShowArgs),
    /// Remove a relation from partition management
    Drop(drop::DropArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(wal) = cli.wal {
        config.storage.wal = wal;
    }
    let env = Env::open(&config)?;

    match cli.command {
        Commands::Init(args) => init::handle(&env, args).await?,
        Commands::Route(args) => route::handle(&env, args).await?,
        Commands::Prune(args) => prune::handle(&env, args).await?,
        Commands::Show(args) => show::handle(&env, args).await?,
        Commands::Drop(args) => drop::handle(&env, args).await?,
    }

    env.runtime.shutdown();
    Ok(())
}

/// Log to stderr so stdout stays machine-readable; `PARTIX_LOG` sets the filter
fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_env("PARTIX_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
