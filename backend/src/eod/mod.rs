//! End-of-day pairwise comparison of the daily histories.
//!
//! Each pair is processed on its own: a pair that cannot be joined or stored
//! is reported in the digest and does not hold back the others.

pub mod diff;

use std::fmt::Write as _;

use chrono::NaiveDate;
use market::ExchangePair;
use tracing::{error, info, instrument};

use crate::error::AggregationError;
use crate::history::PriceHistoryStore;
use crate::storage::{TableStore, table_path};
pub use diff::{DiffRow, DiffStats, diff_stats, diff_table, join_histories};

const DIVIDER: &str = "=================================";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairSummary {
    pub pair: ExchangePair,
    pub date: NaiveDate,

    /// Joined rows, with or without a mid difference.
    pub samples: usize,
    pub stats: Option<DiffStats>,
}

#[derive(Debug)]
pub struct EodReport {
    pub date: NaiveDate,
    pub market: String,
    pub interval_secs: u64,
    pub outcomes: Vec<(ExchangePair, Result<PairSummary, AggregationError>)>,
}

impl EodReport {
    pub fn summaries(&self) -> impl Iterator<Item = &PairSummary> {
        self.outcomes.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_err()).count()
    }

    /// Single notification covering every pair.
    pub fn digest(&self) -> String {
        let mut msg = format!("End of day: {} UTC.\n", self.date.format("%Y-%m-%d"));

        for (pair, outcome) in &self.outcomes {
            let _ = write!(
                msg,
                "\n{DIVIDER}\n\n{} & {} trading {} at interval {} seconds:\n",
                pair.first, pair.second, self.market, self.interval_secs
            );

            match outcome {
                Ok(PairSummary {
                    stats: Some(s), ..
                }) => {
                    let _ = write!(
                        msg,
                        " - Max diff absolute: ${}\n \
                         - Max diff percentage: {}%\n \
                         - Min diff absolute: ${}\n \
                         - Min diff percentage: {}%\n \
                         - Mean diff absolute: ${}\n",
                        s.max_abs, s.max_pct, s.min_abs, s.min_pct, s.mean_abs
                    );
                }
                Ok(PairSummary { stats: None, .. }) => msg.push_str(" - no overlapping samples\n"),
                Err(e) => {
                    let _ = writeln!(msg, " - aggregation failed: {e}");
                }
            }
        }

        msg.truncate(msg.trim_end().len());
        msg
    }
}

pub struct EodAggregator {
    pairs: Vec<ExchangePair>,
    market: String,
    interval_secs: u64,
}

impl EodAggregator {
    pub fn new(pairs: Vec<ExchangePair>, market: impl Into<String>, interval_secs: u64) -> Self {
        Self {
            pairs,
            market: market.into(),
            interval_secs,
        }
    }

    /// Joins, persists and summarizes every pair of `date`.
    #[instrument(skip(self, history, store), fields(pairs = self.pairs.len()))]
    pub async fn run(
        &self,
        history: &PriceHistoryStore,
        date: NaiveDate,
        store: &dyn TableStore,
    ) -> EodReport {
        let mut outcomes = Vec::with_capacity(self.pairs.len());

        for pair in &self.pairs {
            let outcome = self.aggregate_pair(pair, history, date, store).await;
            match &outcome {
                Ok(s) => info!(pair = %pair, samples = s.samples, "pair aggregated"),
                Err(e) => error!(pair = %pair, error = %e, "pair aggregation failed"),
            }
            outcomes.push((pair.clone(), outcome));
        }

        EodReport {
            date,
            market: self.market.clone(),
            interval_secs: self.interval_secs,
            outcomes,
        }
    }

    async fn aggregate_pair(
        &self,
        pair: &ExchangePair,
        history: &PriceHistoryStore,
        date: NaiveDate,
        store: &dyn TableStore,
    ) -> Result<PairSummary, AggregationError> {
        let first = history
            .history(&pair.first)
            .ok_or_else(|| AggregationError::MissingHistory(pair.first.clone()))?;
        let second = history
            .history(&pair.second)
            .ok_or_else(|| AggregationError::MissingHistory(pair.second.clone()))?;

        let rows = join_histories(first, second);

        store
            .persist_table(&table_path(&pair.id(), &self.market, date), &diff_table(pair, &rows))
            .await?;

        Ok(PairSummary {
            pair: pair.clone(),
            date,
            samples: rows.len(),
            stats: diff_stats(&rows),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalTableStore;
    use chrono::{TimeDelta, TimeZone, Utc};
    use market::{Snapshot, TopOfBook};
    use rust_decimal_macros::dec;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn top() -> TopOfBook {
        TopOfBook {
            bid_price: dec!(99.99),
            bid_size: dec!(1),
            ask_price: dec!(100.01),
            ask_size: dec!(1),
            mid: dec!(100.00),
            spread_pct: dec!(0.02),
            loose: false,
        }
    }

    #[tokio::test]
    async fn disjoint_histories_give_an_empty_table_and_a_note() {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut history = PriceHistoryStore::new();
        for i in 0..3 {
            let mut only_a = Snapshot::new(t0 + TimeDelta::seconds(20 * i));
            only_a.insert("A", Some(top()));
            history.append(&only_a);

            let mut only_b = Snapshot::new(t0 + TimeDelta::seconds(20 * i + 10));
            only_b.insert("B", Some(top()));
            history.append(&only_b);
        }

        let dir = tempfile::tempdir().unwrap();
        let store = LocalTableStore::new(dir.path());
        let aggregator = EodAggregator::new(vec![ExchangePair::new("A", "B")], "BTCUSD", 10);

        let report = aggregator.run(&history, day(), &store).await;

        assert_eq!(report.failures(), 0);
        let summary = report.summaries().next().unwrap();
        assert_eq!(summary.samples, 0);
        assert_eq!(summary.stats, None);
        assert!(report.digest().ends_with(
            "A & B trading BTCUSD at interval 10 seconds:\n - no overlapping samples"
        ));

        let table = store
            .load_table("A-B/BTCUSD/2024-06-01.csv")
            .await
            .unwrap()
            .expect("pair table persisted");
        assert!(table.is_empty());
        assert_eq!(table.header.len(), 10);
    }

    #[test]
    fn digest_layout() {
        let ab = ExchangePair::new("A", "B");
        let ac = ExchangePair::new("A", "C");
        let report = EodReport {
            date: day(),
            market: "BTCUSD".into(),
            interval_secs: 10,
            outcomes: vec![
                (
                    ab.clone(),
                    Ok(PairSummary {
                        pair: ab,
                        date: day(),
                        samples: 4,
                        stats: Some(DiffStats {
                            max_abs: dec!(2.00),
                            max_pct: dec!(0.995),
                            min_abs: dec!(0.50),
                            min_pct: dec!(0.499),
                            mean_abs: dec!(1.00),
                        }),
                    }),
                ),
                (ac.clone(), Err(AggregationError::MissingHistory("C".into()))),
            ],
        };

        assert_eq!(
            report.digest(),
            "End of day: 2024-06-01 UTC.\n\
             \n\
             =================================\n\
             \n\
             A & B trading BTCUSD at interval 10 seconds:\n \
             - Max diff absolute: $2.00\n \
             - Max diff percentage: 0.995%\n \
             - Min diff absolute: $0.50\n \
             - Min diff percentage: 0.499%\n \
             - Mean diff absolute: $1.00\n\
             \n\
             =================================\n\
             \n\
             A & C trading BTCUSD at interval 10 seconds:\n \
             - aggregation failed: no history recorded for C"
        );
        assert_eq!(report.failures(), 1);
        assert_eq!(report.summaries().count(), 1);
    }
}
