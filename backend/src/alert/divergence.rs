use rust_decimal::Decimal;

/// Distance between two mids: absolute, and in percent of their average.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Divergence {
    pub abs: Decimal,
    pub pct: Decimal,
}

impl Divergence {
    /// `None` when the average mid is not positive.
    pub fn between(mid_a: Decimal, mid_b: Decimal, precision: u32) -> Option<Self> {
        let abs = (mid_a - mid_b).abs();
        let avg = (mid_a + mid_b) / Decimal::TWO;
        if avg <= Decimal::ZERO {
            return None;
        }

        let pct = abs / avg * Decimal::ONE_HUNDRED;

        Some(Self {
            abs: abs.round_dp(precision),
            pct: pct.round_dp(precision),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn percentage_of_average_mid() {
        let d = Divergence::between(dec!(100.00), dec!(101.00), 3).unwrap();
        assert_eq!(d.abs, dec!(1.00));
        assert_eq!(d.pct, dec!(0.995));

        let small = Divergence::between(dec!(100.00), dec!(100.05), 3).unwrap();
        assert_eq!(small.pct, dec!(0.050));
    }

    #[test]
    fn symmetric() {
        assert_eq!(
            Divergence::between(dec!(3.1), dec!(2.9), 3),
            Divergence::between(dec!(2.9), dec!(3.1), 3)
        );
    }

    #[test]
    fn zero_average_has_no_divergence() {
        assert_eq!(Divergence::between(dec!(0), dec!(0), 3), None);
    }
}
