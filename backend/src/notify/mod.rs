//! Outbound messages. Delivery is best effort: a failed notification is
//! logged and counted, never allowed to fail a tick.

pub mod discord;
pub mod log;

use std::sync::atomic::Ordering;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, warn};

use crate::metrics::counters::Counters;
pub use self::discord::DiscordWebhook;
pub use self::log::LogNotifier;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, messages: &[String]) -> Result<(), NotifyError>;
}

/// Delivers `messages` if there are any; errors stop here.
pub async fn deliver_best_effort(notifier: &dyn Notifier, messages: &[String], counters: &Counters) {
    if messages.is_empty() {
        return;
    }

    if let Err(e) = notifier.deliver(messages).await {
        counters.delivery_failures.fetch_add(1, Ordering::Relaxed);
        error!(error = %e, messages = messages.len(), "notification delivery failed");
        for msg in messages {
            warn!(target: "undelivered", "{msg}");
        }
    }
}
