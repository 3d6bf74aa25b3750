//! Polling loop for one market across all configured exchanges.
//!
//! Per tick:
//! 1) On a new UTC day, close the previous one: persist raw histories, run
//!    the end-of-day aggregation, send the digest, reset the store. On the
//!    first tick after a start, reload the raw tables already written for
//!    the current day instead.
//! 2) Fetch one snapshot from every exchange.
//! 3) Append it to the daily history.
//! 4) Evaluate divergence and frozen-book alerts.
//! 5) Deliver every message of the tick in one batch.
//!
//! All state is owned here and only touched from the tick path.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use common::logger::{TraceId, tick_span};
use market::ExchangePair;
use tracing::{Instrument, debug, error, field, info, warn};

use crate::alert::{DivergenceAlertEngine, ThresholdPolicy};
use crate::config::AppConfig;
use crate::eod::{EodAggregator, EodReport};
use crate::fetcher::QuoteFetcher;
use crate::history::frozen::FrozenOrderbookMonitor;
use crate::history::{PriceHistoryStore, daily_table, quotes_from_table};
use crate::metrics::counters::Counters;
use crate::notify::{Notifier, deliver_best_effort};
use crate::storage::{StorageError, TableStore, table_path};
use crate::time::{now, trading_day, until_next_tick};

#[derive(Clone, Debug)]
pub struct MonitorSettings {
    pub market: String,
    pub interval: Duration,
    pub threshold: ThresholdPolicy,
    pub diff_precision: u32,
    pub frozen_window: usize,
    pub frozen_cooldown: TimeDelta,
}

impl From<&AppConfig> for MonitorSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            market: cfg.market.clone(),
            interval: cfg.poll_interval,
            threshold: ThresholdPolicy {
                base: cfg.threshold_base_pct,
                increment: cfg.threshold_increment_pct,
                reset_after: cfg.threshold_reset,
            },
            diff_precision: cfg.diff_precision,
            frozen_window: cfg.frozen_window,
            frozen_cooldown: cfg.frozen_cooldown,
        }
    }
}

/// What one tick produced.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Messages handed to the notifier, arbitrage alerts first.
    pub messages: Vec<String>,
    pub missing: usize,

    /// Set when this tick closed the previous day.
    pub rollover: Option<EodReport>,
}

pub struct Monitor {
    market: String,
    interval: Duration,

    fetcher: QuoteFetcher,
    history: PriceHistoryStore,
    alerts: DivergenceAlertEngine,
    frozen: FrozenOrderbookMonitor,
    eod: EodAggregator,

    notifier: Arc<dyn Notifier>,
    store: Arc<dyn TableStore>,
    counters: Counters,

    /// UTC day of the last tick; `None` before the first one.
    current_day: Option<NaiveDate>,
}

impl Monitor {
    pub fn new(
        settings: MonitorSettings,
        fetcher: QuoteFetcher,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn TableStore>,
        counters: Counters,
    ) -> Self {
        let pairs = ExchangePair::all(&fetcher.exchanges());
        let interval_secs = settings.interval.as_secs();

        Self {
            alerts: DivergenceAlertEngine::new(
                pairs.clone(),
                settings.threshold,
                settings.market.clone(),
                interval_secs,
                settings.diff_precision,
            ),
            frozen: FrozenOrderbookMonitor::new(
                settings.market.clone(),
                interval_secs,
                settings.frozen_window,
                settings.frozen_cooldown,
            ),
            eod: EodAggregator::new(pairs, settings.market.clone(), interval_secs),
            market: settings.market,
            interval: settings.interval,
            fetcher,
            history: PriceHistoryStore::new(),
            notifier,
            store,
            counters,
            current_day: None,
        }
    }

    pub fn history(&self) -> &PriceHistoryStore {
        &self.history
    }

    pub fn alerts(&self) -> &DivergenceAlertEngine {
        &self.alerts
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Runs one tick for the instant `now`.
    pub async fn on_tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let span = tick_span(&TraceId::default(), &self.market);
        span.record("day", field::display(trading_day(now)));

        self.tick(now).instrument(span).await
    }

    async fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let day = trading_day(now);

        let rollover = match self.current_day {
            Some(prev) if prev != day => Some(self.close_day(prev).await),
            Some(_) => None,
            None => {
                self.resume_day(day).await;
                None
            }
        };
        self.current_day = Some(day);

        let snapshot = self.fetcher.fetch_snapshot(now).await;

        let missing = snapshot.iter().filter(|(_, q)| q.is_missing()).count();
        let loose = snapshot
            .iter()
            .filter(|(_, q)| q.book.is_some_and(|b| b.loose))
            .count();
        Counters::add(&self.counters.ticks, 1);
        Counters::add(&self.counters.missing_quotes, missing);
        Counters::add(&self.counters.loose_quotes, loose);

        self.history.append(&snapshot);

        let arb = self.alerts.evaluate(&snapshot, now);
        let frozen = self.frozen.evaluate(&self.history, now);
        Counters::add(&self.counters.arb_alerts, arb.len());
        Counters::add(&self.counters.frozen_alerts, frozen.len());

        let messages: Vec<String> = arb.iter().map(ToString::to_string).chain(frozen).collect();

        debug!(
            exchanges = snapshot.len(),
            missing,
            loose,
            messages = messages.len(),
            "tick evaluated"
        );

        deliver_best_effort(self.notifier.as_ref(), &messages, &self.counters).await;

        TickReport {
            messages,
            missing,
            rollover,
        }
    }

    /// Persists and aggregates `day`, then starts a fresh history.
    async fn close_day(&mut self, day: NaiveDate) -> EodReport {
        info!(%day, ticks = self.history.ticks(), "closing trading day");

        self.persist_raw(day).await;

        let report = self.eod.run(&self.history, day, self.store.as_ref()).await;
        Counters::add(&self.counters.eod_runs, 1);
        Counters::add(&self.counters.eod_pair_failures, report.failures());

        deliver_best_effort(self.notifier.as_ref(), &[report.digest()], &self.counters).await;

        self.history.reset();
        self.counters.log();

        report
    }

    /// Reloads the raw tables an earlier run persisted for `day`, so the
    /// next write of those tables keeps the rows collected before a restart.
    async fn resume_day(&mut self, day: NaiveDate) {
        if !self.history.is_empty() {
            return;
        }
        let normalizer = *self.fetcher.normalizer();

        for exchange in self.fetcher.exchanges() {
            let path = table_path(&exchange, &self.market, day);

            let loaded: Result<Option<_>, StorageError> =
                match self.store.load_table(&path).await {
                    Ok(Some(table)) if !table.is_empty() => {
                        quotes_from_table(&table, &normalizer).map(Some)
                    }
                    Ok(_) => Ok(None),
                    Err(e) => Err(e),
                };

            match loaded {
                Ok(Some(quotes)) => {
                    info!(exchange = %exchange, path = %path, rows = quotes.len(), "raw history resumed");
                    self.history.restore(&exchange, quotes);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(exchange = %exchange, path = %path, error = %e, "raw history not resumed")
                }
            }
        }
    }

    /// Writes each exchange's history of `day`. Returns how many tables
    /// were stored.
    async fn persist_raw(&self, day: NaiveDate) -> usize {
        let mut stored = 0;

        for exchange in self.history.exchanges() {
            let Some(quotes) = self.history.history(exchange) else {
                continue;
            };
            let path = table_path(exchange, &self.market, day);

            match self.store.persist_table(&path, &daily_table(quotes)).await {
                Ok(()) => stored += 1,
                Err(e) => error!(exchange, path = %path, error = %e, "raw history not persisted"),
            }
        }

        stored
    }

    /// Saves what has been collected of the current day. No digest is sent.
    pub async fn shutdown(&mut self) {
        let Some(day) = self.current_day else {
            return;
        };
        let stored = self.persist_raw(day).await;
        info!(%day, stored, "raw histories persisted on shutdown");
        self.counters.log();
    }

    /// Ticks on wall-clock multiples of the interval until `shutdown`
    /// resolves. Shutdown is only observed between ticks.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            market = %self.market,
            interval_secs = self.interval.as_secs(),
            exchanges = ?self.fetcher.exchanges(),
            "monitor started"
        );

        loop {
            let wait = until_next_tick(now(), self.interval);

            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            self.on_tick(now()).await;
        }

        self.shutdown().await;
    }
}
