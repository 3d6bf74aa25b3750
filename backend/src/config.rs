use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use market::exchanges::ExchangeKind;
use market::{PAIR_SEPARATOR, normalize_market};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("at least two exchanges are required, got {0}")]
    TooFewExchanges(usize),

    #[error("duplicate exchange id {0}")]
    DuplicateExchange(String),

    #[error("exchange id {0:?} must not contain the pair separator")]
    SeparatorInId(String),

    #[error("no adapter for exchange {0}")]
    UnknownExchange(String),

    #[error("exchanges trade different markets: {0} vs {1}")]
    MarketMismatch(String, String),
}

/// One polled venue: which adapter, under which id, for which native symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedConfig {
    pub id: String,
    pub kind: ExchangeKind,

    /// Symbol in the exchange's own notation (`BTC-USD`, `XBTUSD`, ...).
    pub symbol: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    // =========================
    // Market
    // =========================
    /// Polled exchanges, in configuration order. Pair ids and alert
    /// messages follow this order.
    pub feeds: Vec<FeedConfig>,

    /// Canonical market shared by every feed (`BTCUSD`). Used in messages
    /// and storage paths.
    pub market: String,

    // =========================
    // Polling
    // =========================
    /// Tick period. Ticks are aligned on wall-clock multiples of it.
    pub poll_interval: Duration,

    /// Attempts per exchange per tick, first one included.
    pub fetch_max_attempts: u32,

    /// Fixed pause between two attempts.
    pub fetch_backoff: Duration,

    /// Deadline of one attempt. Also used as the HTTP client timeout.
    pub fetch_timeout: Duration,

    // =========================
    // Quote quality
    // =========================
    /// Decimal places kept on mid prices.
    pub mid_precision: u32,

    /// Own bid-ask spread, in percent of mid, above which a book is loose.
    ///
    /// Loose books are stored but never take part in an alert.
    pub max_quote_spread_pct: Decimal,

    // =========================
    // Alerting
    // =========================
    /// Divergence (percent of average mid) an idle pair must exceed.
    pub threshold_base_pct: Decimal,

    /// Step by which a triggered threshold ratchets up.
    pub threshold_increment_pct: Decimal,

    /// Quiet time after the last trigger before a pair falls back to base.
    pub threshold_reset: TimeDelta,

    /// Decimal places kept on divergence values.
    pub diff_precision: u32,

    /// Trailing polls with identical top-of-book that make a book frozen.
    pub frozen_window: usize,

    /// Minimum time between two frozen alerts for the same exchange.
    pub frozen_cooldown: TimeDelta,

    /// Discord webhook. Without it messages only go to the log.
    pub discord_webhook_url: Option<String>,

    // =========================
    // Persistence
    // =========================
    /// Root directory of daily CSV tables.
    pub data_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds and validates a config from any variable source.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_feeds = get("EXCHANGES").ok_or(ConfigError::Missing("EXCHANGES"))?;
        let feeds = parse_feeds(&raw_feeds)?;
        let market = common_market(&feeds)?;

        let cfg = Self {
            feeds,
            market,

            poll_interval: Duration::from_secs(parse_or(&get, "POLL_INTERVAL_SECS", 10u64)?),
            fetch_max_attempts: parse_or(&get, "FETCH_MAX_ATTEMPTS", 5u32)?,
            fetch_backoff: Duration::from_millis(parse_or(&get, "FETCH_BACKOFF_MS", 100u64)?),
            fetch_timeout: Duration::from_millis(parse_or(&get, "FETCH_TIMEOUT_MS", 5_000u64)?),

            mid_precision: parse_or(&get, "MID_PRECISION", 3u32)?,
            max_quote_spread_pct: parse_or(&get, "MAX_QUOTE_SPREAD_PCT", Decimal::new(15, 2))?,

            threshold_base_pct: parse_or(&get, "ALERT_THRESHOLD_BASE_PCT", Decimal::new(2, 1))?,
            threshold_increment_pct: parse_or(
                &get,
                "ALERT_THRESHOLD_INCREMENT_PCT",
                Decimal::new(1, 1),
            )?,
            threshold_reset: parse_secs(&get, "THRESHOLD_RESET_SECS", 3_600)?,
            diff_precision: parse_or(&get, "DIFF_PRECISION", 3u32)?,

            frozen_window: parse_or(&get, "FROZEN_WINDOW", 30usize)?,
            frozen_cooldown: parse_secs(&get, "FROZEN_ALERT_COOLDOWN_SECS", 3_600)?,
            discord_webhook_url: get("DISCORD_WEBHOOK_URL").filter(|s| !s.trim().is_empty()),

            data_dir: get("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data")),
        };

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feeds.len() < 2 {
            return Err(ConfigError::TooFewExchanges(self.feeds.len()));
        }

        check(
            "POLL_INTERVAL_SECS",
            self.poll_interval.as_secs(),
            self.poll_interval >= Duration::from_secs(5),
            "must be at least 5 seconds",
        )?;
        check(
            "ALERT_THRESHOLD_BASE_PCT",
            self.threshold_base_pct,
            self.threshold_base_pct > Decimal::ZERO,
            "must be positive",
        )?;
        check(
            "ALERT_THRESHOLD_INCREMENT_PCT",
            self.threshold_increment_pct,
            self.threshold_increment_pct > Decimal::ZERO,
            "must be positive",
        )?;
        check(
            "THRESHOLD_RESET_SECS",
            self.threshold_reset.num_seconds(),
            self.threshold_reset > TimeDelta::zero(),
            "must be positive",
        )?;
        check(
            "FROZEN_WINDOW",
            self.frozen_window,
            self.frozen_window >= 2,
            "must be at least 2",
        )?;
        check(
            "MAX_QUOTE_SPREAD_PCT",
            self.max_quote_spread_pct,
            self.max_quote_spread_pct > Decimal::ZERO,
            "must be positive",
        )?;
        check(
            "MID_PRECISION",
            self.mid_precision,
            self.mid_precision <= 12,
            "at most 12 decimal places",
        )?;
        check(
            "DIFF_PRECISION",
            self.diff_precision,
            self.diff_precision <= 12,
            "at most 12 decimal places",
        )?;
        check(
            "FETCH_MAX_ATTEMPTS",
            self.fetch_max_attempts,
            self.fetch_max_attempts >= 1,
            "must be at least 1",
        )?;
        check(
            "FETCH_TIMEOUT_MS",
            self.fetch_timeout.as_millis(),
            !self.fetch_timeout.is_zero(),
            "must be positive",
        )?;

        Ok(())
    }

    pub fn exchange_ids(&self) -> Vec<String> {
        self.feeds.iter().map(|f| f.id.clone()).collect()
    }
}

fn parse_or<F, T>(get: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

/// Whole seconds as a [`TimeDelta`]; values chrono cannot represent are
/// rejected here rather than at first use.
fn parse_secs<F>(get: &F, var: &'static str, default: u64) -> Result<TimeDelta, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_or(get, var, default)?;

    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(|| ConfigError::Invalid {
            var,
            value: secs.to_string(),
            reason: "out of range".to_string(),
        })
}

fn check<V: ToString>(
    var: &'static str,
    value: V,
    ok: bool,
    reason: &str,
) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: reason.to_string(),
        })
    }
}

/// `BINANCE=BTCUSDT,KRAKEN=XBTUSDT` → feeds in listed order.
fn parse_feeds(raw: &str) -> Result<Vec<FeedConfig>, ConfigError> {
    let mut feeds: Vec<FeedConfig> = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (id, symbol) = entry
            .split_once('=')
            .map(|(id, sym)| (id.trim(), sym.trim()))
            .filter(|(id, sym)| !id.is_empty() && !sym.is_empty())
            .ok_or_else(|| ConfigError::Invalid {
                var: "EXCHANGES",
                value: entry.to_string(),
                reason: "expected ID=SYMBOL".to_string(),
            })?;

        let id = id.to_ascii_uppercase();
        if id.contains(PAIR_SEPARATOR) {
            return Err(ConfigError::SeparatorInId(id));
        }
        let kind = ExchangeKind::from_id(&id).ok_or_else(|| ConfigError::UnknownExchange(id.clone()))?;
        if feeds.iter().any(|f| f.id == id) {
            return Err(ConfigError::DuplicateExchange(id));
        }

        feeds.push(FeedConfig {
            id,
            kind,
            symbol: symbol.to_string(),
        });
    }

    if feeds.len() < 2 {
        return Err(ConfigError::TooFewExchanges(feeds.len()));
    }

    Ok(feeds)
}

fn common_market(feeds: &[FeedConfig]) -> Result<String, ConfigError> {
    let mut markets = feeds.iter().map(|f| normalize_market(&f.symbol));
    let first = markets.next().unwrap_or_default();

    for other in markets {
        if other != first {
            return Err(ConfigError::MarketMismatch(first, other));
        }
    }

    Ok(first)
}
