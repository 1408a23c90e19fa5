use clap::{Parser, Subcommand};

use crate::domain::SortMode;

#[derive(Parser)]
#[command(name = "subrelay")]
#[command(about = "Subreddit watcher that relays new posts to a Telegram chat")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll subscribed subreddits and serve the admin bot
    Run {
        /// Run a single poll cycle and exit
        #[arg(long)]
        once: bool,

        /// Print payloads instead of sending them; cursors are left untouched
        #[arg(long)]
        dry_run: bool,
    },

    /// Subscribe to a subreddit
    Add {
        /// Subreddit name, with or without the r/ prefix
        name: String,

        /// Listing to follow: new, hot, top-day, top-week, top-month
        #[arg(short, long, default_value = "new")]
        sort: SortMode,

        /// Register without checking that the subreddit exists
        #[arg(long)]
        skip_verify: bool,
    },

    /// Unsubscribe from a subreddit
    Remove {
        /// Subreddit name
        name: String,
    },

    /// List subscriptions and their cursors
    List,

    /// Forget what was sent for a subreddit so recent posts are relayed again
    Reset {
        /// Subreddit name
        name: String,
    },
}
