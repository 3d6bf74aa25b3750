use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

use super::{Notifier, NotifyError};

/// Discord refuses `content` longer than this.
pub const MAX_CONTENT_CHARS: usize = 2000;

#[derive(Serialize)]
struct WebhookBody<'a> {
    content: &'a str,
}

#[derive(Clone)]
pub struct DiscordWebhook {
    http: Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    async fn post(&self, content: &str) -> Result<(), NotifyError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&WebhookBody { content })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for DiscordWebhook {
    #[instrument(skip_all, fields(messages = messages.len()), level = "debug")]
    async fn deliver(&self, messages: &[String]) -> Result<(), NotifyError> {
        for chunk in split_content(messages, MAX_CONTENT_CHARS) {
            self.post(&chunk).await?;
        }
        debug!("webhook delivered");
        Ok(())
    }
}

/// Packs messages into posts of at most `limit` characters, separated by a
/// blank line. A single message above the limit is cut on line boundaries,
/// or hard-cut when one line alone is too long.
pub fn split_content(messages: &[String], limit: usize) -> Vec<String> {
    let mut posts = Vec::new();
    let mut current = String::new();

    for msg in messages {
        for piece in cut(msg, limit) {
            let needed = if current.is_empty() {
                piece.chars().count()
            } else {
                current.chars().count() + 2 + piece.chars().count()
            };

            if needed > limit && !current.is_empty() {
                posts.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(&piece);
        }
    }

    if !current.is_empty() {
        posts.push(current);
    }
    posts
}

fn cut(msg: &str, limit: usize) -> Vec<String> {
    if msg.chars().count() <= limit {
        return vec![msg.to_string()];
    }

    let mut out = Vec::new();
    let mut current = String::new();

    for line in msg.lines() {
        for part in hard_cut(line, limit) {
            let len = current.chars().count();
            if !current.is_empty() && len + 1 + part.chars().count() > limit {
                out.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(&part);
        }
    }

    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn hard_cut(line: &str, limit: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.len() <= limit {
        return vec![line.to_string()];
    }
    chars.chunks(limit.max(1)).map(|c| c.iter().collect()).collect()
}
