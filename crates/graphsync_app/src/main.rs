//! `graphsync`: checkpointed follow/unfollow runs for one account.

mod cli;
mod commands;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use graphsync_engine::{ensure_storage_dir, AccountContext};
use log::LevelFilter;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let root = cli
        .storage_root()
        .context("no home directory; pass --data-dir or set GRAPHSYNC_HOME")?;
    let ctx = AccountContext::open(&root, &cli.account)
        .with_context(|| format!("loading settings for {}", cli.account))?;

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let log_file = ensure_storage_dir(&ctx.dir).ok().map(|()| ctx.log_path());
    graphsync_logging::initialize(level, log_file.as_deref());

    match cli.command {
        Command::Authorize(args) => commands::authorize(&ctx, args),
        Command::Follow { count, query } => commands::follow(&ctx, count, &query).await,
        Command::Unfollow => commands::unfollow(&ctx).await,
    }
}
