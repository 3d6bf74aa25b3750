use std::time::Duration;

use market::{ExchangeError, QuoteError};
use thiserror::Error;

use crate::storage::StorageError;

/// Why one exchange produced no quote on a tick.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Quote(#[from] QuoteError),
}

impl FetchError {
    /// Validation failures are final; a bad book will be bad again 100ms later.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Exchange(e) => e.is_retryable(),
            FetchError::Timeout(_) => true,
            FetchError::Quote(_) => false,
        }
    }
}

/// Failure of one exchange pair during end-of-day aggregation.
#[derive(Error, Debug)]
pub enum AggregationError {
    #[error("no history recorded for {0}")]
    MissingHistory(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
