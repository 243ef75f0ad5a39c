//! Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Follow fresh accounts from a search, unfollow the ones that never follow back.
#[derive(Debug, Parser)]
#[command(name = "graphsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Account to act for.
    pub account: String,

    /// Root of the per-account storage directories [default: ~/.graphsync].
    #[arg(long, env = "GRAPHSYNC_HOME", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store API credentials obtained out of band.
    Authorize(AuthorizeArgs),

    /// Search recent posts and follow up to COUNT new authors.
    Follow {
        count: usize,
        /// Search query; quote it when it has spaces.
        query: String,
    },

    /// Unfollow accounts that do not follow back.
    Unfollow,
}

#[derive(Debug, Args)]
pub struct AuthorizeArgs {
    #[arg(long, env = "GRAPHSYNC_CONSUMER_KEY")]
    pub consumer_key: String,
    #[arg(long, env = "GRAPHSYNC_CONSUMER_SECRET", hide_env_values = true)]
    pub consumer_secret: String,
    #[arg(long, env = "GRAPHSYNC_ACCESS_TOKEN")]
    pub access_token: String,
    #[arg(long, env = "GRAPHSYNC_ACCESS_TOKEN_SECRET", hide_env_values = true)]
    pub access_token_secret: String,
}

impl Cli {
    /// Storage root: `--data-dir`, then `GRAPHSYNC_HOME`, then `~/.graphsync`.
    pub fn storage_root(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".graphsync")))
    }
}
