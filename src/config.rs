//! Configuration types and constants.

use clap::Parser;

/// Capacity of each per-table change broadcast channel.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Base interval between change-feed polls on the HTTP store.
pub(crate) const CHANGE_POLL_INTERVAL_SECS: u64 = 2;

/// Cap for the change-feed poll backoff after consecutive failures.
pub(crate) const CHANGE_POLL_MAX_BACKOFF_SECS: u64 = 60;

/// Default number of delivery attempts for a notification job.
pub(crate) const NOTIFY_MAX_ATTEMPTS: u32 = 3;

/// Base delay before a notification retry; doubles per attempt.
pub(crate) const NOTIFY_RETRY_BASE_MS: u64 = 250;

/// Follow a conversation on a Ripple record-store service.
///
/// Prints the watched conversation's state transitions and any alerts the
/// data layer raises.  Configuration can be set via CLI arguments or
/// environment variables; CLI arguments take precedence.
#[derive(Parser, Debug)]
#[command(name = "ripple-watch", version, about)]
pub struct Cli {
    /// Record store base URL [env: RIPPLE_STORE_URL]
    #[arg(long, short = 's')]
    pub store_url: Option<String>,

    /// API key sent with every request [env: RIPPLE_API_KEY]
    #[arg(long, short = 'k')]
    pub api_key: Option<String>,

    /// Conversation id to follow
    #[arg(long, short = 'c')]
    pub conversation: String,
}

pub struct Config {
    pub store_url: String,
    pub api_key: Option<String>,
    pub conversation: String,
}

impl Config {
    pub fn from_cli_and_env(cli: Cli) -> Self {
        let store_url = cli
            .store_url
            .or_else(|| std::env::var("RIPPLE_STORE_URL").ok())
            .unwrap_or_else(|| "http://127.0.0.1:4000".to_string());

        let api_key = cli
            .api_key
            .or_else(|| std::env::var("RIPPLE_API_KEY").ok());

        Self {
            store_url,
            api_key,
            conversation: cli.conversation,
        }
    }
}
