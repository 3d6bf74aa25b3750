//! Raw orderbook → top-of-book.
//!
//! Exchanges advertise their books sorted best-first. The normalizer does not
//! trust that: it computes the extremes itself and rejects the book when the
//! first listed level is not the best one.

use rust_decimal::Decimal;

use crate::errors::QuoteError;
use crate::types::{RawLevel, RawOrderBook, Side, TopOfBook};

#[derive(Clone, Copy, Debug)]
pub struct QuoteNormalizer {
    /// Decimal places kept on the mid price.
    pub mid_precision: u32,

    /// Own-spread ceiling in percent; wider books are flagged loose.
    pub max_spread_pct: Decimal,
}

impl QuoteNormalizer {
    pub fn new(mid_precision: u32, max_spread_pct: Decimal) -> Self {
        Self {
            mid_precision,
            max_spread_pct,
        }
    }

    pub fn normalize(&self, book: &RawOrderBook) -> Result<TopOfBook, QuoteError> {
        let ask = best_level(&book.asks, Side::Ask)?;
        let bid = best_level(&book.bids, Side::Bid)?;

        let mid = ((ask.price + bid.price) / Decimal::TWO).round_dp(self.mid_precision);
        if mid <= Decimal::ZERO {
            return Err(QuoteError::NonPositiveMid(mid));
        }

        let spread_pct = (ask.price - bid.price).abs() / mid * Decimal::ONE_HUNDRED;

        Ok(TopOfBook {
            bid_price: bid.price,
            bid_size: bid.size,
            ask_price: ask.price,
            ask_size: ask.size,
            mid,
            spread_pct,
            loose: spread_pct > self.max_spread_pct,
        })
    }
}

/// Lowest ask / highest bid, first occurrence on ties, checked against the
/// first listed level.
fn best_level(levels: &[RawLevel], side: Side) -> Result<RawLevel, QuoteError> {
    let first = *levels.first().ok_or(QuoteError::EmptySide(side))?;

    let best = levels.iter().skip(1).fold(first, |best, level| {
        let better = match side {
            Side::Ask => level.price < best.price,
            Side::Bid => level.price > best.price,
        };
        if better { *level } else { best }
    });

    if best.price != first.price {
        return Err(QuoteError::OrderbookIntegrity {
            side,
            listed: first.price,
            best: best.price,
        });
    }

    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn lv(price: Decimal, size: Decimal) -> RawLevel {
        RawLevel::new(price, size)
    }

    fn normalizer() -> QuoteNormalizer {
        QuoteNormalizer::new(3, dec!(0.15))
    }

    #[test]
    fn picks_best_levels_and_mid() {
        let book = RawOrderBook {
            asks: vec![lv(dec!(100.10), dec!(2)), lv(dec!(100.20), dec!(5))],
            bids: vec![lv(dec!(100.00), dec!(3)), lv(dec!(99.90), dec!(1))],
        };

        let top = normalizer().normalize(&book).unwrap();

        assert_eq!(top.ask_price, dec!(100.10));
        assert_eq!(top.ask_size, dec!(2));
        assert_eq!(top.bid_price, dec!(100.00));
        assert_eq!(top.bid_size, dec!(3));
        assert_eq!(top.mid, dec!(100.050));
        assert!(!top.loose);
    }

    #[test]
    fn mid_is_rounded_to_precision() {
        let book = RawOrderBook {
            asks: vec![lv(dec!(1.00015), dec!(1))],
            bids: vec![lv(dec!(1.0000), dec!(1))],
        };

        let top = QuoteNormalizer::new(3, dec!(1)).normalize(&book).unwrap();
        assert_eq!(top.mid, dec!(1.000));
    }

    #[test]
    fn unsorted_asks_violate_integrity() {
        let book = RawOrderBook {
            asks: vec![lv(dec!(101), dec!(1)), lv(dec!(100.5), dec!(1))],
            bids: vec![lv(dec!(100), dec!(1))],
        };

        let err = normalizer().normalize(&book).unwrap_err();
        assert_eq!(
            err,
            QuoteError::OrderbookIntegrity {
                side: Side::Ask,
                listed: dec!(101),
                best: dec!(100.5),
            }
        );
    }

    #[test]
    fn unsorted_bids_violate_integrity() {
        let book = RawOrderBook {
            asks: vec![lv(dec!(101), dec!(1))],
            bids: vec![lv(dec!(99), dec!(1)), lv(dec!(100), dec!(1))],
        };

        assert!(matches!(
            normalizer().normalize(&book),
            Err(QuoteError::OrderbookIntegrity { side: Side::Bid, .. })
        ));
    }

    #[test]
    fn equal_price_levels_keep_first_size() {
        let book = RawOrderBook {
            asks: vec![lv(dec!(100), dec!(1)), lv(dec!(100), dec!(9))],
            bids: vec![lv(dec!(99.99), dec!(4)), lv(dec!(99.99), dec!(8))],
        };

        let top = normalizer().normalize(&book).unwrap();
        assert_eq!(top.ask_size, dec!(1));
        assert_eq!(top.bid_size, dec!(4));
    }

    #[test]
    fn empty_side_is_rejected() {
        let book = RawOrderBook {
            asks: vec![],
            bids: vec![lv(dec!(100), dec!(1))],
        };

        assert_eq!(
            normalizer().normalize(&book),
            Err(QuoteError::EmptySide(Side::Ask))
        );
    }

    #[test]
    fn wide_spread_is_flagged_loose_but_kept() {
        // 1.0 / 100.5 * 100 ≈ 0.995% > 0.15%
        let book = RawOrderBook {
            asks: vec![lv(dec!(101), dec!(1))],
            bids: vec![lv(dec!(100), dec!(1))],
        };

        let top = normalizer().normalize(&book).unwrap();
        assert!(top.loose);
        assert_eq!(top.mid, dec!(100.5));
        assert!(top.spread_pct > dec!(0.99) && top.spread_pct < dec!(1.0));
    }

    #[test]
    fn zero_prices_are_rejected() {
        let book = RawOrderBook {
            asks: vec![lv(dec!(0), dec!(1))],
            bids: vec![lv(dec!(0), dec!(1))],
        };

        assert!(matches!(
            normalizer().normalize(&book),
            Err(QuoteError::NonPositiveMid(_))
        ));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn levels() -> impl Strategy<Value = Vec<RawLevel>> {
        prop::collection::vec((1u32..=10_000_000, 1u32..=1_000), 1..15).prop_map(|v| {
            v.into_iter()
                .map(|(p, s)| RawLevel::new(Decimal::new(p as i64, 2), Decimal::new(s as i64, 3)))
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]
        #[test]
        fn best_levels_match_extremes_or_fail_integrity(asks in levels(), bids in levels()) {
            let min_ask = asks.iter().map(|l| l.price).min().unwrap();
            let max_bid = bids.iter().map(|l| l.price).max().unwrap();
            let sorted = asks[0].price == min_ask && bids[0].price == max_bid;

            let book = RawOrderBook { asks, bids };
            let res = QuoteNormalizer::new(3, Decimal::ONE).normalize(&book);

            if sorted {
                let top = res.unwrap();
                prop_assert_eq!(top.ask_price, min_ask);
                prop_assert_eq!(top.bid_price, max_bid);
            } else {
                let is_integrity = matches!(res, Err(QuoteError::OrderbookIntegrity { .. }));
                prop_assert!(is_integrity);
            }
        }
    }
}
