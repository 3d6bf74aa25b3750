use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use super::ExchangeClient;
use super::http::get_json;
use super::levels::DepthPayload;
use crate::errors::ExchangeError;
use crate::types::RawOrderBook;

pub const GLOBAL_URL: &str = "https://api.binance.com";
pub const US_URL: &str = "https://api.binance.us";

const DEPTH_LIMIT: u32 = 20;

/// Spot depth endpoint, shared by Binance and Binance.US.
#[derive(Clone)]
pub struct BinanceClient {
    http: Client,
    url: String,
    name: String,
}

impl BinanceClient {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            name: "BINANCE".to_string(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// `{"lastUpdateId": .., "bids": [["price", "qty"]], "asks": [..]}`
pub fn parse_depth(body: Value) -> Result<RawOrderBook, ExchangeError> {
    let payload: DepthPayload = serde_json::from_value(body)
        .map_err(|e| ExchangeError::InvalidResponse(format!("binance depth: {e}")))?;
    payload.into_book()
}

#[async_trait]
impl ExchangeClient for BinanceClient {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(exchange = %self.name), level = "debug")]
    async fn fetch_orderbook(&self, market: &str) -> Result<RawOrderBook, ExchangeError> {
        let url = format!(
            "{}/api/v3/depth?symbol={}&limit={}",
            self.url, market, DEPTH_LIMIT
        );

        let book = parse_depth(get_json(&self.http, &url).await?)?;

        debug!(
            asks = book.asks.len(),
            bids = book.bids.len(),
            "binance depth fetched"
        );

        Ok(book)
    }
}
