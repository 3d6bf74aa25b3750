use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Separator used when rendering an exchange pair id (`"BINANCE-KRAKEN"`).
/// Exchange identifiers must never contain it.
pub const PAIR_SEPARATOR: char = '-';

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Ask,
    Bid,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Ask => f.write_str("ask"),
            Side::Bid => f.write_str("bid"),
        }
    }
}

/// One `[price, size]` level as listed by the exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl RawLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// Orderbook as returned by an exchange, levels kept in the advertised order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOrderBook {
    pub asks: Vec<RawLevel>,
    pub bids: Vec<RawLevel>,
}

/// Best bid/ask of one exchange, validated and reduced to a mid price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopOfBook {
    pub bid_price: Decimal,
    pub bid_size: Decimal,
    pub ask_price: Decimal,
    pub ask_size: Decimal,

    /// `(ask + bid) / 2`, rounded to the normalizer's precision.
    pub mid: Decimal,

    /// Own bid-ask spread relative to mid, in percent.
    pub spread_pct: Decimal,

    /// Spread above the sanity ceiling. Stored, never alerted on.
    pub loose: bool,
}

impl TopOfBook {
    /// True when both books show the exact same best levels.
    pub fn same_levels(&self, other: &TopOfBook) -> bool {
        self.bid_price == other.bid_price
            && self.bid_size == other.bid_size
            && self.ask_price == other.ask_price
            && self.ask_size == other.ask_size
    }
}

/// One exchange's top-of-book at a capture instant.
///
/// `book == None` is a missing quote: the exchange could not be fetched or its
/// payload failed validation for this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub captured_at: DateTime<Utc>,
    pub book: Option<TopOfBook>,
}

impl Quote {
    pub fn missing(captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            book: None,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.book.is_none()
    }

    pub fn mid(&self) -> Option<Decimal> {
        self.book.map(|b| b.mid)
    }

    /// A quote that may take part in a divergence alert: present and tight.
    pub fn alertable(&self) -> Option<&TopOfBook> {
        self.book.as_ref().filter(|b| !b.loose)
    }
}

/// Quotes of every configured exchange captured at one shared instant.
///
/// The instant is fixed at construction and stamped on every inserted quote,
/// so histories built from snapshots can later be joined on exact timestamps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    captured_at: DateTime<Utc>,
    quotes: Vec<(String, Quote)>,
}

impl Snapshot {
    pub fn new(captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            quotes: Vec::new(),
        }
    }

    /// Records `exchange`'s book, replacing an earlier entry for the same exchange.
    pub fn insert(&mut self, exchange: impl Into<String>, book: Option<TopOfBook>) {
        let exchange = exchange.into();
        let quote = Quote {
            captured_at: self.captured_at,
            book,
        };

        match self.quotes.iter_mut().find(|(ex, _)| *ex == exchange) {
            Some((_, slot)) => *slot = quote,
            None => self.quotes.push((exchange, quote)),
        }
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn get(&self, exchange: &str) -> Option<&Quote> {
        self.quotes
            .iter()
            .find(|(ex, _)| ex == exchange)
            .map(|(_, q)| q)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Quote)> {
        self.quotes.iter().map(|(ex, q)| (ex.as_str(), q))
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }
}

/// Unordered pair of configured exchanges, kept in configuration order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExchangePair {
    pub first: String,
    pub second: String,
}

impl ExchangePair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    pub fn id(&self) -> String {
        format!("{}{}{}", self.first, PAIR_SEPARATOR, self.second)
    }

    /// Every 2-combination of `exchanges`, `n * (n - 1) / 2` pairs.
    pub fn all(exchanges: &[String]) -> Vec<ExchangePair> {
        let mut out = Vec::with_capacity(exchanges.len() * exchanges.len().saturating_sub(1) / 2);
        for (i, first) in exchanges.iter().enumerate() {
            for second in &exchanges[i + 1..] {
                out.push(ExchangePair::new(first.clone(), second.clone()));
            }
        }
        out
    }
}

impl fmt::Display for ExchangePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.first, PAIR_SEPARATOR, self.second)
    }
}

/// Canonical market name used to compare symbols across exchanges.
///
/// `"btc-usd"`, `"BTC/USD"` and `"XBTUSD"` all become `"BTCUSD"`.
pub fn normalize_market(symbol: &str) -> String {
    let compact: String = symbol
        .chars()
        .filter(|c| !matches!(c, '-' | '/' | '_'))
        .flat_map(char::to_uppercase)
        .collect();

    match compact.strip_prefix("XBT") {
        Some(rest) => format!("BTC{rest}"),
        None => compact,
    }
}
