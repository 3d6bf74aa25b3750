//! Fan-out of one top-of-book request per exchange.
//!
//! Every feed is fetched concurrently and independently retried; the results
//! are joined before the [`Snapshot`] is built, so the snapshot is assembled
//! by a single owner and carries one capture instant.

pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::logger::warn_if_slow;
use futures::future::join_all;
use market::exchanges::ExchangeClient;
use market::{QuoteNormalizer, Snapshot, TopOfBook};
use tracing::{debug, instrument, warn};

use crate::error::FetchError;
use retry::{RetryPolicy, retry};

const SLOW_FANOUT: Duration = Duration::from_secs(3);

/// One exchange to poll: its configured id, its native symbol and the adapter.
#[derive(Clone)]
pub struct ExchangeFeed {
    pub exchange: String,
    pub symbol: String,
    pub client: Arc<dyn ExchangeClient>,
}

impl ExchangeFeed {
    pub fn new(
        exchange: impl Into<String>,
        symbol: impl Into<String>,
        client: Arc<dyn ExchangeClient>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            symbol: symbol.into(),
            client,
        }
    }
}

pub struct QuoteFetcher {
    feeds: Vec<ExchangeFeed>,
    normalizer: QuoteNormalizer,
    retry: RetryPolicy,

    /// Deadline of a single attempt, backoff excluded.
    attempt_timeout: Duration,
}

impl QuoteFetcher {
    pub fn new(
        feeds: Vec<ExchangeFeed>,
        normalizer: QuoteNormalizer,
        retry: RetryPolicy,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            feeds,
            normalizer,
            retry,
            attempt_timeout,
        }
    }

    pub fn exchanges(&self) -> Vec<String> {
        self.feeds.iter().map(|f| f.exchange.clone()).collect()
    }

    pub fn normalizer(&self) -> &QuoteNormalizer {
        &self.normalizer
    }

    /// Polls every feed and returns one quote per exchange, in feed order,
    /// all stamped with `captured_at`. Never fails: an exchange that cannot
    /// deliver a valid book appears as a missing quote.
    #[instrument(skip(self), level = "debug", fields(feeds = self.feeds.len()))]
    pub async fn fetch_snapshot(&self, captured_at: DateTime<Utc>) -> Snapshot {
        let books = warn_if_slow(
            "fetch_snapshot",
            SLOW_FANOUT,
            join_all(self.feeds.iter().map(|feed| self.fetch_top(feed))),
        )
        .await;

        let mut snapshot = Snapshot::new(captured_at);
        for (feed, book) in self.feeds.iter().zip(books) {
            snapshot.insert(feed.exchange.clone(), book);
        }
        snapshot
    }

    async fn fetch_top(&self, feed: &ExchangeFeed) -> Option<TopOfBook> {
        let res = retry(self.retry, FetchError::is_retryable, |attempt| async move {
            debug!(exchange = %feed.exchange, attempt, "requesting orderbook");

            let raw = tokio::time::timeout(
                self.attempt_timeout,
                feed.client.fetch_orderbook(&feed.symbol),
            )
            .await
            .map_err(|_| FetchError::Timeout(self.attempt_timeout))??;

            Ok::<_, FetchError>(self.normalizer.normalize(&raw)?)
        })
        .await;

        match res {
            Ok(top) => {
                if top.loose {
                    debug!(
                        exchange = %feed.exchange,
                        spread_pct = %top.spread_pct,
                        "loose orderbook"
                    );
                }
                Some(top)
            }
            Err(e) => {
                warn!(exchange = %feed.exchange, symbol = %feed.symbol, error = %e, "missing quote");
                None
            }
        }
    }
}
