use super::types::GlidePath;

pub const STOCK_RETURN: f64 = 0.10;
pub const BOND_RETURN: f64 = 0.04;
pub const STOCK_VOLATILITY: f64 = 0.18;
pub const BOND_VOLATILITY: f64 = 0.05;

/// Share of the portfolio held in equities at `age`, following the glide path.
pub fn stock_allocation(age: u32, glide: &GlidePath) -> f64 {
    let age = f64::from(age);
    let retirement_age = f64::from(glide.retirement_age);
    let transition_years = f64::from(glide.transition_years);
    let transition_start = retirement_age - transition_years;

    let pct = if age < transition_start {
        glide.stock_pct_accumulation
    } else if age < retirement_age {
        let progress = (age - transition_start) / transition_years;
        glide.stock_pct_accumulation
            + (glide.stock_pct_retirement - glide.stock_pct_accumulation) * progress
    } else {
        glide.stock_pct_retirement
    };

    pct.clamp(0.0, 1.0)
}

pub fn expected_return(age: u32, glide: &GlidePath) -> f64 {
    let stock = stock_allocation(age, glide);
    stock * STOCK_RETURN + (1.0 - stock) * BOND_RETURN
}

/// Blended standard deviation, treating the two asset classes as uncorrelated.
pub fn volatility(age: u32, glide: &GlidePath) -> f64 {
    let stock = stock_allocation(age, glide);
    let bond = 1.0 - stock;
    (stock * stock * STOCK_VOLATILITY * STOCK_VOLATILITY
        + bond * bond * BOND_VOLATILITY * BOND_VOLATILITY)
        .sqrt()
}

/// Inflation-adjusted return used by the deterministic base case.
pub fn real_return(nominal: f64, inflation: f64) -> f64 {
    (1.0 + nominal) / (1.0 + inflation) - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn glide() -> GlidePath {
        GlidePath {
            retirement_age: 65,
            transition_years: 10,
            stock_pct_accumulation: 0.90,
            stock_pct_retirement: 0.60,
        }
    }

    #[test]
    fn allocation_holds_accumulation_share_before_transition() {
        assert_approx(stock_allocation(30, &glide()), 0.90);
        assert_approx(stock_allocation(55, &glide()), 0.90);
    }

    #[test]
    fn allocation_interpolates_inside_transition() {
        assert_approx(stock_allocation(60, &glide()), 0.75);
        assert_approx(stock_allocation(64, &glide()), 0.63);
    }

    #[test]
    fn allocation_holds_retirement_share_from_retirement_age() {
        assert_approx(stock_allocation(65, &glide()), 0.60);
        assert_approx(stock_allocation(90, &glide()), 0.60);
    }

    #[test]
    fn zero_transition_years_switches_at_retirement() {
        let mut g = glide();
        g.transition_years = 0;
        assert_approx(stock_allocation(64, &g), 0.90);
        assert_approx(stock_allocation(65, &g), 0.60);
    }

    #[test]
    fn transition_longer_than_age_starts_interpolated() {
        let mut g = glide();
        g.retirement_age = 10;
        g.transition_years = 20;
        // transition began at -10, so age 0 is half way through.
        assert_approx(stock_allocation(0, &g), 0.75);
    }

    #[test]
    fn expected_return_blends_asset_classes() {
        assert_approx(expected_return(30, &glide()), 0.9 * 0.10 + 0.1 * 0.04);
        assert_approx(expected_return(70, &glide()), 0.6 * 0.10 + 0.4 * 0.04);
    }

    #[test]
    fn volatility_matches_uncorrelated_blend() {
        let expected = (0.36_f64 * 0.0324 + 0.16 * 0.0025).sqrt();
        assert_approx(volatility(70, &glide()), expected);
    }

    #[test]
    fn real_return_divides_out_inflation() {
        assert_approx(real_return(0.0815, 0.03), 1.0815 / 1.03 - 1.0);
        assert_approx(real_return(0.05, 0.0), 0.05);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_allocation_stays_between_endpoints(
            age in 0u32..110,
            retirement_age in 1u32..90,
            transition_years in 0u32..40,
            acc_pct in 0u32..101,
            ret_pct in 0u32..101
        ) {
            let g = GlidePath {
                retirement_age,
                transition_years,
                stock_pct_accumulation: acc_pct as f64 / 100.0,
                stock_pct_retirement: ret_pct as f64 / 100.0,
            };
            let pct = stock_allocation(age, &g);
            let lo = g.stock_pct_accumulation.min(g.stock_pct_retirement);
            let hi = g.stock_pct_accumulation.max(g.stock_pct_retirement);
            prop_assert!((0.0..=1.0).contains(&pct));
            prop_assert!(pct >= lo - 1e-12 && pct <= hi + 1e-12);
            if i64::from(age) <= i64::from(retirement_age) - i64::from(transition_years) {
                prop_assert!((pct - g.stock_pct_accumulation).abs() < 1e-12);
            }
        }

        #[test]
        fn prop_allocation_moves_monotonically_toward_retirement_share(
            age in 0u32..100,
            retirement_age in 1u32..90,
            transition_years in 1u32..40
        ) {
            let g = GlidePath {
                retirement_age,
                transition_years,
                stock_pct_accumulation: 0.9,
                stock_pct_retirement: 0.4,
            };
            prop_assert!(stock_allocation(age + 1, &g) <= stock_allocation(age, &g) + 1e-12);
        }
    }
}
