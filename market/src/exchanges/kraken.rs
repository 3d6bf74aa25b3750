use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::ExchangeClient;
use super::http::get_json;
use super::levels::DepthPayload;
use crate::errors::ExchangeError;
use crate::types::RawOrderBook;

pub const DEFAULT_URL: &str = "https://api.kraken.com";

const DEPTH_COUNT: u32 = 20;

#[derive(Clone)]
pub struct KrakenClient {
    http: Client,
    url: String,
}

impl KrakenClient {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct KrakenEnvelope {
    #[serde(default)]
    error: Vec<String>,
    #[serde(default)]
    result: HashMap<String, DepthPayload>,
}

/// `{"error": [], "result": {"XXBTZUSD": {"asks": [["p", "v", ts]], "bids": [..]}}}`
///
/// Kraken keys the book by its internal pair name, which differs from the
/// requested symbol, so the single entry of `result` is taken as is.
pub fn parse_depth(body: Value) -> Result<RawOrderBook, ExchangeError> {
    let envelope: KrakenEnvelope = serde_json::from_value(body)
        .map_err(|e| ExchangeError::InvalidResponse(format!("kraken depth: {e}")))?;

    if !envelope.error.is_empty() {
        return Err(ExchangeError::InvalidResponse(envelope.error.join("; ")));
    }

    let payload = envelope
        .result
        .into_values()
        .next()
        .ok_or_else(|| ExchangeError::InvalidResponse("kraken depth: empty result".into()))?;

    payload.into_book()
}

#[async_trait]
impl ExchangeClient for KrakenClient {
    fn name(&self) -> &str {
        "KRAKEN"
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_orderbook(&self, market: &str) -> Result<RawOrderBook, ExchangeError> {
        let url = format!(
            "{}/0/public/Depth?pair={}&count={}",
            self.url, market, DEPTH_COUNT
        );

        let book = parse_depth(get_json(&self.http, &url).await?)?;

        debug!(
            asks = book.asks.len(),
            bids = book.bids.len(),
            "kraken depth fetched"
        );

        Ok(book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn decodes_depth_under_internal_pair_name() {
        let body = json!({
            "error": [],
            "result": {
                "XXBTZUSD": {
                    "asks": [["30001.10000", "0.500", 1688671659]],
                    "bids": [["30001.00000", "1.250", 1688671658]]
                }
            }
        });

        let book = parse_depth(body).unwrap();
        assert_eq!(book.asks[0].price, dec!(30001.1));
        assert_eq!(book.bids[0].size, dec!(1.25));
    }

    #[test]
    fn api_errors_surface_as_invalid_response() {
        let body = json!({"error": ["EQuery:Unknown asset pair"]});

        match parse_depth(body) {
            Err(ExchangeError::InvalidResponse(msg)) => assert!(msg.contains("Unknown asset pair")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
