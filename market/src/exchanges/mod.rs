//! REST adapters for public orderbook endpoints.
//!
//! Each adapter only knows how to reach its venue and decode the payload into a
//! [`RawOrderBook`]; validation and best-level extraction live in the normalizer.

pub mod binance;
pub mod coinbase;
pub mod http;
pub mod kraken;
pub mod levels;
pub mod okx;

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::ExchangeError;
use crate::types::RawOrderBook;

pub use binance::BinanceClient;
pub use coinbase::CoinbaseClient;
pub use kraken::KrakenClient;
pub use okx::OkxClient;

/// Capability to fetch one market's orderbook from one exchange.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_orderbook(&self, market: &str) -> Result<RawOrderBook, ExchangeError>;
}

/// Venues with a built-in adapter, selected by configured exchange id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExchangeKind {
    Binance,
    BinanceUs,
    Coinbase,
    Kraken,
    Okx,
}

impl ExchangeKind {
    pub const ALL: [ExchangeKind; 5] = [
        ExchangeKind::Binance,
        ExchangeKind::BinanceUs,
        ExchangeKind::Coinbase,
        ExchangeKind::Kraken,
        ExchangeKind::Okx,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ExchangeKind::Binance => "BINANCE",
            ExchangeKind::BinanceUs => "BINANCE_US",
            ExchangeKind::Coinbase => "COINBASE",
            ExchangeKind::Kraken => "KRAKEN",
            ExchangeKind::Okx => "OKX",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.id().eq_ignore_ascii_case(id))
    }

    /// Builds the adapter for this venue on top of a shared HTTP client.
    pub fn client(&self, http: reqwest::Client) -> Arc<dyn ExchangeClient> {
        match self {
            ExchangeKind::Binance => Arc::new(BinanceClient::new(http, binance::GLOBAL_URL)),
            ExchangeKind::BinanceUs => {
                Arc::new(BinanceClient::new(http, binance::US_URL).named(self.id()))
            }
            ExchangeKind::Coinbase => Arc::new(CoinbaseClient::new(http, coinbase::DEFAULT_URL)),
            ExchangeKind::Kraken => Arc::new(KrakenClient::new(http, kraken::DEFAULT_URL)),
            ExchangeKind::Okx => Arc::new(OkxClient::new(http, okx::DEFAULT_URL)),
        }
    }
}
