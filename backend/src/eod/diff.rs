use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use market::{ExchangePair, Quote};
use rust_decimal::Decimal;

use crate::storage::Table;

/// Decimal places of per-row differences and of the mean.
pub const ROW_PRECISION: u32 = 2;

/// Decimal places of the min/max percentages.
pub const PCT_PRECISION: u32 = 3;

/// One timestamp present in both histories. Cells are empty when either side
/// had no book at that tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffRow {
    pub timestamp: DateTime<Utc>,
    pub first_ask: Option<Decimal>,
    pub second_ask: Option<Decimal>,
    pub ask_diff: Option<Decimal>,
    pub first_bid: Option<Decimal>,
    pub second_bid: Option<Decimal>,
    pub bid_diff: Option<Decimal>,
    pub first_mid: Option<Decimal>,
    pub second_mid: Option<Decimal>,
    pub mid_diff: Option<Decimal>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiffStats {
    pub max_abs: Decimal,
    pub max_pct: Decimal,
    pub min_abs: Decimal,
    pub min_pct: Decimal,
    pub mean_abs: Decimal,
}

fn abs_diff(a: Option<Decimal>, b: Option<Decimal>) -> Option<Decimal> {
    a.zip(b).map(|(a, b)| (a - b).abs().round_dp(ROW_PRECISION))
}

/// Inner join on exact capture instant, in `first`'s order.
pub fn join_histories(first: &[Quote], second: &[Quote]) -> Vec<DiffRow> {
    let by_time: HashMap<DateTime<Utc>, &Quote> = second
        .iter()
        .rev()
        .map(|q| (q.captured_at, q))
        .collect();

    first
        .iter()
        .filter_map(|a| by_time.get(&a.captured_at).map(|b| (a, *b)))
        .map(|(a, b)| {
            let (fa, fb, fm) = sides(a);
            let (sa, sb, sm) = sides(b);
            DiffRow {
                timestamp: a.captured_at,
                first_ask: fa,
                second_ask: sa,
                ask_diff: abs_diff(fa, sa),
                first_bid: fb,
                second_bid: sb,
                bid_diff: abs_diff(fb, sb),
                first_mid: fm,
                second_mid: sm,
                mid_diff: abs_diff(fm, sm),
            }
        })
        .collect()
}

fn sides(q: &Quote) -> (Option<Decimal>, Option<Decimal>, Option<Decimal>) {
    match &q.book {
        Some(b) => (Some(b.ask_price), Some(b.bid_price), Some(b.mid)),
        None => (None, None, None),
    }
}

/// Max and min mid difference (first occurrence wins), each with its
/// percentage of that row's average mid, plus the mean difference.
///
/// `None` when no row has a mid difference.
pub fn diff_stats(rows: &[DiffRow]) -> Option<DiffStats> {
    let mut with_mid = rows.iter().filter_map(|r| {
        let diff = r.mid_diff?;
        let avg = (r.first_mid? + r.second_mid?) / Decimal::TWO;
        Some((diff, avg))
    });

    let first = with_mid.next()?;
    let (mut max, mut min) = (first, first);
    let mut sum = first.0;
    let mut count = 1u32;

    for cur in with_mid {
        if cur.0 > max.0 {
            max = cur;
        }
        if cur.0 < min.0 {
            min = cur;
        }
        sum += cur.0;
        count += 1;
    }

    Some(DiffStats {
        max_abs: max.0,
        max_pct: pct_of(max),
        min_abs: min.0,
        min_pct: pct_of(min),
        mean_abs: (sum / Decimal::from(count)).round_dp(ROW_PRECISION),
    })
}

fn pct_of((diff, avg): (Decimal, Decimal)) -> Decimal {
    if avg.is_zero() {
        return Decimal::ZERO;
    }
    (diff / avg * Decimal::ONE_HUNDRED).round_dp(PCT_PRECISION)
}

pub fn diff_table(pair: &ExchangePair, rows: &[DiffRow]) -> Table {
    let (a, b, p) = (&pair.first, &pair.second, pair.id());
    let mut table = Table::new([
        "timestamp".to_string(),
        format!("{a}_ask"),
        format!("{b}_ask"),
        format!("{p}_ask"),
        format!("{a}_bid"),
        format!("{b}_bid"),
        format!("{p}_bid"),
        format!("{a}_mid"),
        format!("{b}_mid"),
        format!("{p}_mid"),
    ]);

    let cell = |v: Option<Decimal>| v.map(|d| d.to_string()).unwrap_or_default();

    for r in rows {
        table.push(vec![
            r.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            cell(r.first_ask),
            cell(r.second_ask),
            cell(r.ask_diff),
            cell(r.first_bid),
            cell(r.second_bid),
            cell(r.bid_diff),
            cell(r.first_mid),
            cell(r.second_mid),
            cell(r.mid_diff),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use market::TopOfBook;
    use rust_decimal_macros::dec;

    fn at(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() + TimeDelta::seconds(10 * i)
    }

    fn quote(i: i64, mid: Option<Decimal>) -> Quote {
        Quote {
            captured_at: at(i),
            book: mid.map(|m| TopOfBook {
                bid_price: m - dec!(0.5),
                bid_size: dec!(1),
                ask_price: m + dec!(0.5),
                ask_size: dec!(1),
                mid: m,
                spread_pct: dec!(0.01),
                loose: false,
            }),
        }
    }

    #[test]
    fn joins_only_shared_instants() {
        let a = vec![quote(0, Some(dec!(100))), quote(1, Some(dec!(101))), quote(2, Some(dec!(102)))];
        let b = vec![quote(1, Some(dec!(100))), quote(2, Some(dec!(104))), quote(3, Some(dec!(99)))];

        let rows = join_histories(&a, &b);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, at(1));
        assert_eq!(rows[0].mid_diff, Some(dec!(1)));
        assert_eq!(rows[1].ask_diff, Some(dec!(2)));
    }

    #[test]
    fn disjoint_histories_join_to_nothing() {
        let a = vec![quote(0, Some(dec!(100))), quote(2, Some(dec!(101)))];
        let b = vec![quote(1, Some(dec!(100))), quote(3, Some(dec!(101)))];

        let rows = join_histories(&a, &b);
        assert!(rows.is_empty());
        assert_eq!(diff_stats(&rows), None);
        assert!(join_histories(&[], &[]).is_empty());
    }

    #[test]
    fn identical_histories_have_zero_divergence() {
        let a: Vec<Quote> = (0..5)
            .map(|i| quote(i, Some(dec!(100) + Decimal::from(i))))
            .collect();

        let rows = join_histories(&a, &a);
        assert_eq!(rows.len(), 5);
        for row in &rows {
            assert_eq!(row.ask_diff, Some(Decimal::ZERO));
            assert_eq!(row.bid_diff, Some(Decimal::ZERO));
            assert_eq!(row.mid_diff, Some(Decimal::ZERO));
        }

        let stats = diff_stats(&rows).unwrap();
        assert_eq!(stats.max_abs, Decimal::ZERO);
        assert_eq!(stats.max_pct, Decimal::ZERO);
        assert_eq!(stats.mean_abs, Decimal::ZERO);
    }

    #[test]
    fn missing_side_leaves_empty_cells() {
        let rows = join_histories(&[quote(0, None)], &[quote(0, Some(dec!(100)))]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mid_diff, None);
        assert_eq!(rows[0].second_mid, Some(dec!(100)));
        assert_eq!(diff_stats(&rows), None);
    }

    #[test]
    fn stats_pick_first_extremes() {
        let a = vec![
            quote(0, Some(dec!(100))),
            quote(1, Some(dec!(100))),
            quote(2, Some(dec!(200))),
            quote(3, Some(dec!(100))),
        ];
        let b = vec![
            quote(0, Some(dec!(101))),
            quote(1, Some(dec!(100.5))),
            quote(2, Some(dec!(202))),
            quote(3, Some(dec!(100.5))),
        ];

        let stats = diff_stats(&join_histories(&a, &b)).unwrap();

        // Max 2.00 on row 2, avg 201.
        assert_eq!(stats.max_abs, dec!(2));
        assert_eq!(stats.max_pct, dec!(0.995));
        // Min 0.5 first seen on row 1, avg 100.25.
        assert_eq!(stats.min_abs, dec!(0.5));
        assert_eq!(stats.min_pct, dec!(0.499));
        // (1 + 0.5 + 2 + 0.5) / 4
        assert_eq!(stats.mean_abs, dec!(1.00));
    }

    #[test]
    fn row_differences_round_to_cents() {
        let rows = join_histories(&[quote(0, Some(dec!(100.004)))], &[quote(0, Some(dec!(100.0)))]);
        assert_eq!(rows[0].mid_diff, Some(dec!(0.00)));
    }

    #[test]
    fn table_columns_follow_pair_order() {
        let pair = ExchangePair::new("A", "B");
        let table = diff_table(&pair, &join_histories(&[quote(0, None)], &[quote(0, Some(dec!(10)))]));

        assert_eq!(
            table.header,
            vec!["timestamp", "A_ask", "B_ask", "A-B_ask", "A_bid", "B_bid", "A-B_bid", "A_mid", "B_mid", "A-B_mid"]
        );
        assert_eq!(
            table.rows[0],
            vec!["2024-06-01T00:00:00Z", "", "10.5", "", "", "9.5", "", "", "10", ""]
        );
    }
}
