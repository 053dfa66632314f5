//! ripple-watch: follow one conversation on a record-store service.
//!
//! Operator tool for poking at a deployment: spawns the conversation
//! watcher against the HTTP store and prints every state transition and
//! alert until interrupted.

use std::sync::Arc;

use clap::Parser;

use ripple::alerts;
use ripple::config::{Cli, Config};
use ripple::logging;
use ripple::rlog;
use ripple::store::HttpStore;
use ripple::watcher::ConversationWatcher;

#[tokio::main]
async fn main() {
    logging::init();
    let config = Config::from_cli_and_env(Cli::parse());

    rlog!(
        "watching conversation {} on {}",
        logging::conv_id(&config.conversation),
        config.store_url
    );

    let store = Arc::new(HttpStore::new(config.store_url, config.api_key));
    let (alert_sink, mut alert_rx) = alerts::channel();

    tokio::spawn(async move {
        while let Some(alert) = alert_rx.recv().await {
            rlog!(
                "alert [{:?}] {}: {}",
                alert.severity,
                alert.title,
                alert.description
            );
        }
    });

    let watcher = ConversationWatcher::spawn(store, alert_sink, config.conversation);
    let mut states = watcher.subscribe();

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow().clone();
                match (state.loading, &state.conversation) {
                    (true, _) => rlog!("state: loading"),
                    (false, Some(c)) => rlog!(
                        "state: loaded {} (last message at {})",
                        logging::conv_id(&c.id),
                        c.last_message_at
                    ),
                    (false, None) => rlog!("state: no conversation"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                rlog!("interrupted, stopping");
                break;
            }
        }
    }

    watcher.stop();
}
