use async_trait::async_trait;
use tracing::info;

use super::{Notifier, NotifyError};

/// Fallback when no webhook is configured: messages only reach the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, messages: &[String]) -> Result<(), NotifyError> {
        for msg in messages {
            info!(target: "notify", "{msg}");
        }
        Ok(())
    }
}
