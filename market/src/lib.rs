//! Market data primitives: raw orderbooks, normalized top-of-book quotes,
//! synchronized snapshots and the REST adapters that produce them.

pub mod errors;
pub mod exchanges;
pub mod normalizer;
pub mod types;

pub use errors::{ExchangeError, QuoteError};
pub use normalizer::QuoteNormalizer;
pub use types::*;
