//! Per-exchange daily quote history.
//!
//! Rows are appended once per tick per exchange and only dropped by
//! [`PriceHistoryStore::reset`] after the day has been aggregated.

pub mod frozen;

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use market::{Quote, QuoteNormalizer, RawLevel, RawOrderBook, Snapshot};
use rust_decimal::Decimal;

use crate::storage::{StorageError, Table};

pub const RAW_COLUMNS: [&str; 6] = [
    "timestamp",
    "bid_price",
    "ask_price",
    "bid_size",
    "ask_size",
    "mid",
];

#[derive(Debug, Default)]
pub struct PriceHistoryStore {
    /// Exchange id → quotes in capture order.
    histories: BTreeMap<String, Vec<Quote>>,
    ticks: usize,
}

impl PriceHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// One row per exchange of the snapshot; sequences are created lazily.
    pub fn append(&mut self, snapshot: &Snapshot) {
        for (exchange, quote) in snapshot.iter() {
            self.histories
                .entry(exchange.to_string())
                .or_default()
                .push(*quote);
        }
        self.ticks += 1;
    }

    pub fn history(&self, exchange: &str) -> Option<&[Quote]> {
        self.histories.get(exchange).map(Vec::as_slice)
    }

    pub fn exchanges(&self) -> impl Iterator<Item = &str> {
        self.histories.keys().map(String::as_str)
    }

    /// Snapshots appended since the last reset.
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn is_empty(&self) -> bool {
        self.ticks == 0
    }

    /// Exchanges whose last `window` rows all show the same top-of-book.
    ///
    /// The history must be strictly longer than `window`, and a missing quote
    /// anywhere in the window rules the exchange out.
    pub fn frozen_check(&self, window: usize) -> Vec<String> {
        if window == 0 {
            return Vec::new();
        }

        self.histories
            .iter()
            .filter(|(_, rows)| rows.len() > window && is_frozen(&rows[rows.len() - window..]))
            .map(|(exchange, _)| exchange.clone())
            .collect()
    }

    /// Puts rows recorded by an earlier run in front of `exchange`'s history.
    pub fn restore(&mut self, exchange: &str, mut quotes: Vec<Quote>) {
        let rows = self.histories.entry(exchange.to_string()).or_default();
        quotes.append(rows);
        *rows = quotes;

        let len = rows.len();
        self.ticks = self.ticks.max(len);
    }

    pub fn reset(&mut self) {
        self.histories.clear();
        self.ticks = 0;
    }
}

/// One exchange's day as a table; missing quotes keep their row with empty
/// cells.
pub fn daily_table(quotes: &[Quote]) -> Table {
    let mut table = Table::new(RAW_COLUMNS);

    for quote in quotes {
        let mut row = vec![quote
            .captured_at
            .to_rfc3339_opts(SecondsFormat::Secs, true)];

        match &quote.book {
            Some(b) => row.extend(
                [b.bid_price, b.ask_price, b.bid_size, b.ask_size, b.mid].map(|v| v.to_string()),
            ),
            None => row.extend(std::iter::repeat_n(String::new(), 5)),
        }
        table.push(row);
    }

    table
}

/// Inverse of [`daily_table`]. Present books are normalized again so the
/// spread and loose flag match the current settings.
pub fn quotes_from_table(
    table: &Table,
    normalizer: &QuoteNormalizer,
) -> Result<Vec<Quote>, StorageError> {
    if table.header.iter().map(String::as_str).ne(RAW_COLUMNS) {
        return Err(StorageError::InvalidTable(format!(
            "unexpected header {:?}",
            table.header
        )));
    }

    table
        .rows
        .iter()
        .map(|row| parse_row(row, normalizer))
        .collect()
}

fn parse_row(row: &[String], normalizer: &QuoteNormalizer) -> Result<Quote, StorageError> {
    let invalid = |reason: String| StorageError::InvalidTable(format!("row {row:?}: {reason}"));

    let [ts, bid, ask, bid_size, ask_size, _mid] = row else {
        return Err(invalid(format!("expected {} cells", RAW_COLUMNS.len())));
    };

    let captured_at = DateTime::parse_from_rfc3339(ts)
        .map_err(|e| invalid(e.to_string()))?
        .with_timezone(&Utc);

    if bid.is_empty() && ask.is_empty() {
        return Ok(Quote::missing(captured_at));
    }

    let num = |cell: &String| cell.parse::<Decimal>().map_err(|e| invalid(e.to_string()));
    let book = RawOrderBook {
        asks: vec![RawLevel::new(num(ask)?, num(ask_size)?)],
        bids: vec![RawLevel::new(num(bid)?, num(bid_size)?)],
    };
    let top = normalizer
        .normalize(&book)
        .map_err(|e| invalid(e.to_string()))?;

    Ok(Quote {
        captured_at,
        book: Some(top),
    })
}

fn is_frozen(rows: &[Quote]) -> bool {
    let Some(first) = rows.first().and_then(|q| q.book) else {
        return false;
    };

    rows.iter()
        .all(|q| q.book.is_some_and(|b| b.same_levels(&first)))
}
