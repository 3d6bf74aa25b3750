use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use super::ExchangeClient;
use super::http::get_json;
use super::levels::DepthPayload;
use crate::errors::ExchangeError;
use crate::types::RawOrderBook;

pub const DEFAULT_URL: &str = "https://api.exchange.coinbase.com";

#[derive(Clone)]
pub struct CoinbaseClient {
    http: Client,
    url: String,
}

impl CoinbaseClient {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

/// Level 2 book: `{"bids": [["price", "size", num_orders]], "asks": [..], "sequence": ..}`
pub fn parse_book(body: Value) -> Result<RawOrderBook, ExchangeError> {
    let payload: DepthPayload = serde_json::from_value(body)
        .map_err(|e| ExchangeError::InvalidResponse(format!("coinbase book: {e}")))?;
    payload.into_book()
}

#[async_trait]
impl ExchangeClient for CoinbaseClient {
    fn name(&self) -> &str {
        "COINBASE"
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_orderbook(&self, market: &str) -> Result<RawOrderBook, ExchangeError> {
        let url = format!("{}/products/{}/book?level=2", self.url, market);

        let book = parse_book(get_json(&self.http, &url).await?)?;

        debug!(
            asks = book.asks.len(),
            bids = book.bids.len(),
            "coinbase book fetched"
        );

        Ok(book)
    }
}
