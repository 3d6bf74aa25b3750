use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::info;

use super::PriceHistoryStore;

/// Turns frozen-book verdicts into messages, at most one per exchange per
/// cooldown.
#[derive(Debug)]
pub struct FrozenOrderbookMonitor {
    market: String,
    interval_secs: u64,
    window: usize,
    cooldown: TimeDelta,
    last_alert: HashMap<String, DateTime<Utc>>,
}

impl FrozenOrderbookMonitor {
    pub fn new(market: impl Into<String>, interval_secs: u64, window: usize, cooldown: TimeDelta) -> Self {
        Self {
            market: market.into(),
            interval_secs,
            window,
            cooldown,
            last_alert: HashMap::new(),
        }
    }

    pub fn evaluate(&mut self, history: &PriceHistoryStore, now: DateTime<Utc>) -> Vec<String> {
        let mut msgs = Vec::new();

        for exchange in history.frozen_check(self.window) {
            let cooling = self
                .last_alert
                .get(&exchange)
                .is_some_and(|last| now - *last < self.cooldown);
            if cooling {
                continue;
            }

            info!(exchange = %exchange, window = self.window, "frozen orderbook");
            msgs.push(self.format(&exchange));
            self.last_alert.insert(exchange, now);
        }

        msgs
    }

    fn format(&self, exchange: &str) -> String {
        format!(
            "ALERT: FROZEN ORDERBOOK\n\
             {exchange} trading {market} at interval {interval} seconds.\n\
             The orderbook has stayed the same for the last {window} requests.",
            market = self.market,
            interval = self.interval_secs,
            window = self.window,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use market::{Snapshot, TopOfBook};
    use rust_decimal_macros::dec;

    fn frozen_store(ticks: i64) -> PriceHistoryStore {
        let book = TopOfBook {
            bid_price: dec!(10),
            bid_size: dec!(1),
            ask_price: dec!(10.01),
            ask_size: dec!(1),
            mid: dec!(10.005),
            spread_pct: dec!(0.1),
            loose: false,
        };
        let mut store = PriceHistoryStore::new();
        for i in 0..ticks {
            let mut s = Snapshot::new(Utc.timestamp_opt(1_700_000_000 + i * 10, 0).unwrap());
            s.insert("KRAKEN", Some(book));
            store.append(&s);
        }
        store
    }

    #[test]
    fn alerts_once_per_cooldown() {
        let store = frozen_store(4);
        let mut monitor = FrozenOrderbookMonitor::new("BTCUSD", 10, 3, TimeDelta::hours(1));
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        let first = monitor.evaluate(&store, now);
        assert_eq!(
            first,
            vec![
                "ALERT: FROZEN ORDERBOOK\n\
                 KRAKEN trading BTCUSD at interval 10 seconds.\n\
                 The orderbook has stayed the same for the last 3 requests."
                    .to_string()
            ]
        );

        assert!(monitor.evaluate(&store, now + TimeDelta::minutes(59)).is_empty());
        assert_eq!(monitor.evaluate(&store, now + TimeDelta::hours(1)).len(), 1);
    }

    #[test]
    fn nothing_to_report_below_window() {
        let store = frozen_store(3);
        let mut monitor = FrozenOrderbookMonitor::new("BTCUSD", 10, 3, TimeDelta::hours(1));
        assert!(monitor.evaluate(&store, Utc::now()).is_empty());
    }
}
