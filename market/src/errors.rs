use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::Side;

/// Failure talking to an exchange's public REST API.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("exchange returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("numeric parse error: {0}")]
    Decimal(#[from] rust_decimal::Error),
}

impl ExchangeError {
    /// Transport failures, rate limiting and server-side errors are worth another
    /// attempt; a payload we cannot read will not improve by asking again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExchangeError::Http(e) => !e.is_decode() && !e.is_builder(),
            ExchangeError::Status { status, .. } => *status == 429 || *status >= 500,
            ExchangeError::InvalidResponse(_) | ExchangeError::Decimal(_) => false,
        }
    }
}

/// The payload was fetched but does not describe a usable top-of-book.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[error("orderbook has no {0} levels")]
    EmptySide(Side),

    #[error("orderbook integrity violated on {side} side: first listed {listed}, best {best}")]
    OrderbookIntegrity {
        side: Side,
        listed: Decimal,
        best: Decimal,
    },

    #[error("non-positive mid price {0}")]
    NonPositiveMid(Decimal),
}
