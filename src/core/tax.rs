/// Married-filing-jointly ordinary income brackets as `(upper limit, marginal rate)`.
const INCOME_BRACKETS: [(f64, f64); 7] = [
    (23_850.0, 0.10),
    (96_950.0, 0.12),
    (206_700.0, 0.22),
    (394_600.0, 0.24),
    (501_050.0, 0.32),
    (751_600.0, 0.35),
    (f64::INFINITY, 0.37),
];

const CAPITAL_GAINS_ZERO_RATE_LIMIT: f64 = 94_050.0;
const CAPITAL_GAINS_MID_RATE_LIMIT: f64 = 583_750.0;
const CAPITAL_GAINS_MID_RATE: f64 = 0.15;
const CAPITAL_GAINS_TOP_RATE: f64 = 0.20;

pub fn income_tax(ordinary_income: f64) -> f64 {
    let mut tax = 0.0;
    let mut previous_limit = 0.0;

    for (limit, rate) in INCOME_BRACKETS {
        if ordinary_income <= previous_limit {
            break;
        }
        let taxable_in_bracket = ordinary_income.min(limit) - previous_limit;
        tax += taxable_in_bracket * rate;
        previous_limit = limit;
    }

    tax
}

/// Tax owed on `ordinary_income` beyond what `base_income` already owes.
pub fn marginal_income_tax(base_income: f64, additional: f64) -> f64 {
    income_tax(base_income + additional) - income_tax(base_income)
}

/// The whole of `gains` is taxed at the single rate selected by total income;
/// gains are not split across tiers.
pub fn capital_gains_tax(gains: f64, other_ordinary_income: f64) -> f64 {
    let total = other_ordinary_income + gains;

    if total <= CAPITAL_GAINS_ZERO_RATE_LIMIT {
        0.0
    } else if total <= CAPITAL_GAINS_MID_RATE_LIMIT {
        gains * CAPITAL_GAINS_MID_RATE
    } else {
        gains * CAPITAL_GAINS_TOP_RATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn income_tax_is_zero_for_non_positive_income() {
        assert_approx(income_tax(0.0), 0.0);
        assert_approx(income_tax(-5_000.0), 0.0);
    }

    #[test]
    fn income_tax_first_bracket_is_ten_percent() {
        assert_approx(income_tax(10_000.0), 1_000.0);
        assert_approx(income_tax(23_850.0), 2_385.0);
    }

    #[test]
    fn income_tax_spans_multiple_brackets() {
        // 2,385 + 12% of 73,100 + 22% of 3,050
        let expected = 2_385.0 + 73_100.0 * 0.12 + 3_050.0 * 0.22;
        assert_approx(income_tax(100_000.0), expected);
    }

    #[test]
    fn income_tax_top_bracket_is_unbounded() {
        let at_limit = income_tax(751_600.0);
        assert_approx(income_tax(851_600.0) - at_limit, 37_000.0);
    }

    #[test]
    fn income_tax_is_continuous_at_each_boundary() {
        for (limit, _) in INCOME_BRACKETS.iter().take(6) {
            let below = income_tax(limit - 1e-6);
            let above = income_tax(limit + 1e-6);
            assert!((above - below).abs() < 1e-5, "jump at {limit}");
        }
    }

    #[test]
    fn marginal_income_tax_matches_difference() {
        let base = 80_000.0;
        assert_approx(
            marginal_income_tax(base, 30_000.0),
            income_tax(110_000.0) - income_tax(80_000.0),
        );
    }

    #[test]
    fn capital_gains_tax_uses_single_tier_for_whole_gain() {
        assert_approx(capital_gains_tax(50_000.0, 40_000.0), 0.0);
        // Total of 100,000 crosses into the 15% tier; the whole gain is taxed at 15%.
        assert_approx(capital_gains_tax(50_000.0, 50_000.0), 7_500.0);
        assert_approx(capital_gains_tax(100_000.0, 500_000.0), 20_000.0);
    }

    #[test]
    fn capital_gains_tier_limits_are_inclusive() {
        assert_approx(capital_gains_tax(94_050.0, 0.0), 0.0);
        assert_approx(capital_gains_tax(583_750.0, 0.0), 583_750.0 * 0.15);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_income_tax_is_non_decreasing(
            base in 0u32..1_200_000,
            delta in 0u32..200_000
        ) {
            let lo = income_tax(base as f64);
            let hi = income_tax(base as f64 + delta as f64);
            prop_assert!(hi >= lo);
        }

        #[test]
        fn prop_capital_gains_tax_zero_without_gains(other in 0u32..2_000_000) {
            prop_assert!(capital_gains_tax(0.0, other as f64) == 0.0);
        }

        #[test]
        fn prop_capital_gains_tax_non_decreasing_in_gains(
            gains in 0u32..1_000_000,
            delta in 0u32..300_000,
            other in 0u32..800_000
        ) {
            let lo = capital_gains_tax(gains as f64, other as f64);
            let hi = capital_gains_tax(gains as f64 + delta as f64, other as f64);
            prop_assert!(hi >= lo);
        }
    }
}
