pub mod alerts;
pub mod cities;
pub mod comments;
pub mod config;
pub mod connections;
pub mod error;
pub mod likes;
pub mod logging;
pub mod messaging;
pub mod notifier;
pub mod posts;
pub mod profiles;
pub mod rows;
pub mod saved;
pub mod store;
pub mod watcher;
