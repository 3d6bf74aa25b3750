use std::fmt;

use chrono::{DateTime, Utc};
use market::{ExchangePair, Snapshot};
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::divergence::Divergence;
use super::threshold::{ThresholdPolicy, ThresholdState};

/// A pair whose divergence went above its current threshold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArbitrageAlert {
    pub pair: ExchangePair,
    pub market: String,
    pub interval_secs: u64,

    /// Threshold that was surpassed, before the ratchet.
    pub threshold: Decimal,
    pub divergence: Divergence,
    pub mid_first: Decimal,
    pub mid_second: Decimal,
}

impl fmt::Display for ArbitrageAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ExchangePair { first, second } = &self.pair;

        writeln!(f, "ALERT: Arbitrage opportunity.")?;
        writeln!(
            f,
            "{first} & {second} trading {} at interval {} seconds:",
            self.market, self.interval_secs
        )?;
        writeln!(
            f,
            "Diff surpassed % threshold of: {}%",
            self.threshold.round_dp(2)
        )?;
        writeln!(f, "Percentage price difference: {}%", self.divergence.pct)?;
        writeln!(f, "Absolute price difference: ${}", self.divergence.abs)?;
        write!(
            f,
            "{first}-price: {}, {second}-price: {}",
            self.mid_first, self.mid_second
        )
    }
}

/// Per-pair divergence check with a ratcheting threshold.
///
/// Owns one [`ThresholdState`] per configured pair; nothing else mutates them.
#[derive(Debug)]
pub struct DivergenceAlertEngine {
    pairs: Vec<(ExchangePair, ThresholdState)>,
    policy: ThresholdPolicy,
    market: String,
    interval_secs: u64,
    diff_precision: u32,
}

impl DivergenceAlertEngine {
    pub fn new(
        pairs: Vec<ExchangePair>,
        policy: ThresholdPolicy,
        market: impl Into<String>,
        interval_secs: u64,
        diff_precision: u32,
    ) -> Self {
        let base = ThresholdState::base(&policy);
        Self {
            pairs: pairs.into_iter().map(|p| (p, base)).collect(),
            policy,
            market: market.into(),
            interval_secs,
            diff_precision,
        }
    }

    pub fn threshold(&self, pair_id: &str) -> Option<&ThresholdState> {
        self.pairs
            .iter()
            .find(|(p, _)| p.id() == pair_id)
            .map(|(_, st)| st)
    }

    /// Checks every pair against `snapshot`. Pairs with a missing or loose
    /// leg are skipped without touching their threshold.
    pub fn evaluate(&mut self, snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<ArbitrageAlert> {
        let mut alerts = Vec::new();

        for (pair, state) in self.pairs.iter_mut() {
            let legs = snapshot
                .get(&pair.first)
                .and_then(|q| q.alertable())
                .zip(snapshot.get(&pair.second).and_then(|q| q.alertable()));

            let Some((a, b)) = legs else {
                debug!(pair = %pair, "pair skipped: missing or loose quote");
                continue;
            };

            let Some(divergence) = Divergence::between(a.mid, b.mid, self.diff_precision) else {
                continue;
            };

            if state.refresh(&self.policy, now) {
                debug!(pair = %pair, base = %self.policy.base, "threshold reset to base");
            }

            if divergence.pct <= state.value {
                continue;
            }

            let surpassed = state.value;
            state.ratchet(&self.policy, divergence.pct, now);

            info!(
                pair = %pair,
                pct = %divergence.pct,
                threshold = %surpassed,
                next_threshold = %state.value,
                steps = state.steps,
                "divergence above threshold"
            );

            alerts.push(ArbitrageAlert {
                pair: pair.clone(),
                market: self.market.clone(),
                interval_secs: self.interval_secs,
                threshold: surpassed,
                divergence,
                mid_first: a.mid,
                mid_second: b.mid,
            });
        }

        alerts
    }
}
