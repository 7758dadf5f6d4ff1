pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "estuary", about = "Paginated sync and cache engine for heterogeneous content sources", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage content sources
    Sources {
        #[command(subcommand)]
        command: SourceCommands,
    },
    /// Sync configured streams
    Sync {
        /// Only sync streams belonging to this source
        #[arg(long)]
        source: Option<String>,
        /// Bypass freshness checks and refetch everything
        #[arg(long)]
        force: bool,
    },
    /// Show a cached page of a source's topic stream
    Topics {
        source: String,
        /// Stream ID, e.g. a forum's native ID or the feed URL token
        stream: String,
        #[arg(long, default_value_t = 0)]
        offset: i64,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Load and show replies for a thread
    Comments {
        source: String,
        /// The thread's native ID
        topic: String,
        /// Fetch the next page instead of refreshing
        #[arg(long)]
        more: bool,
    },
    /// Load and show a source's trend tab
    Trends {
        source: String,
        #[arg(default_value = "hot")]
        tab: String,
    },
    /// List boards exposed by a source
    Forums { source: String },
    /// Drop cached rows and pagination state for one stream
    Clear {
        /// topics | comments | trend
        kind: String,
        stream: String,
    },
}

#[derive(Subcommand)]
pub enum SourceCommands {
    /// Register a source: forum_rest | rss | json_feed | html | discourse
    Add {
        id: String,
        kind: String,
        base_url: String,
    },
    /// List registered sources
    List,
    /// Remove a source
    Remove { id: String },
}
