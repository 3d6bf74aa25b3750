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

pub const DEFAULT_URL: &str = "https://www.okx.com";

const DEPTH_SIZE: u32 = 20;

#[derive(Clone)]
pub struct OkxClient {
    http: Client,
    url: String,
}

impl OkxClient {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OkxEnvelope {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<DepthPayload>,
}

/// `{"code": "0", "msg": "", "data": [{"asks": [["px", "sz", "0", "n"]], "bids": [..], "ts": ".."}]}`
pub fn parse_books(body: Value) -> Result<RawOrderBook, ExchangeError> {
    let envelope: OkxEnvelope = serde_json::from_value(body)
        .map_err(|e| ExchangeError::InvalidResponse(format!("okx books: {e}")))?;

    if envelope.code != "0" {
        return Err(ExchangeError::InvalidResponse(format!(
            "okx code {}: {}",
            envelope.code, envelope.msg
        )));
    }

    envelope
        .data
        .into_iter()
        .next()
        .ok_or_else(|| ExchangeError::InvalidResponse("okx books: empty data".into()))?
        .into_book()
}

#[async_trait]
impl ExchangeClient for OkxClient {
    fn name(&self) -> &str {
        "OKX"
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_orderbook(&self, market: &str) -> Result<RawOrderBook, ExchangeError> {
        let url = format!(
            "{}/api/v5/market/books?instId={}&sz={}",
            self.url, market, DEPTH_SIZE
        );

        let book = parse_books(get_json(&self.http, &url).await?)?;

        debug!(
            asks = book.asks.len(),
            bids = book.bids.len(),
            "okx books fetched"
        );

        Ok(book)
    }
}
