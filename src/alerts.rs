//! User-facing alert side channel.
//!
//! Data operations never render anything themselves; user-visible failures
//! are posted here and the embedding UI drains the receiver into whatever
//! toast mechanism it has.

use tokio::sync::mpsc;

use crate::rlog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Alert {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Success,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Error,
        }
    }
}

/// Cloneable sending half of the alert channel.
#[derive(Debug, Clone)]
pub struct AlertSink {
    tx: mpsc::UnboundedSender<Alert>,
}

impl AlertSink {
    /// Post an alert.  A closed channel (the UI is gone) is a no-op; losing
    /// a toast must never fail a data operation.
    pub fn post(&self, alert: Alert) {
        if self.tx.send(alert).is_err() {
            rlog!("alerts: channel closed, alert dropped");
        }
    }
}

/// Create the alert channel: a sink for the data layer and a receiver for
/// the UI.
pub fn channel() -> (AlertSink, mpsc::UnboundedReceiver<Alert>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (AlertSink { tx }, rx)
}
