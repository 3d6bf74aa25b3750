use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

/// Minimal counters for operational visibility.
#[derive(Clone, Default, Debug)]
pub struct Counters {
    pub ticks: Arc<AtomicU64>,
    pub missing_quotes: Arc<AtomicU64>,
    pub loose_quotes: Arc<AtomicU64>,

    // alerts
    pub arb_alerts: Arc<AtomicU64>,
    pub frozen_alerts: Arc<AtomicU64>,
    pub delivery_failures: Arc<AtomicU64>,

    pub eod_runs: Arc<AtomicU64>,
    pub eod_pair_failures: Arc<AtomicU64>,
}

impl Counters {
    pub fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    pub fn log(&self) {
        info!(
            target: "metrics",
            ticks = Self::get(&self.ticks),
            missing_quotes = Self::get(&self.missing_quotes),
            loose_quotes = Self::get(&self.loose_quotes),
            arb_alerts = Self::get(&self.arb_alerts),
            frozen_alerts = Self::get(&self.frozen_alerts),
            delivery_failures = Self::get(&self.delivery_failures),
            eod_runs = Self::get(&self.eod_runs),
            eod_pair_failures = Self::get(&self.eod_pair_failures),
            "counters"
        );
    }
}
