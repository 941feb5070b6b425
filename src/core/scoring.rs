use super::income::benefit_income;
use super::types::{PlanAssessment, RetirementYearRecord, ScenarioConfig};

/// Multiple of average annual shortfall a retirement pot is measured against.
const COVERAGE_MULTIPLE: f64 = 25.0;
/// Coverage reported when retirement has no funding shortfall at all.
const UNLIMITED_COVERAGE: f64 = 10.0;
const FAILING_SCORE_WEIGHT: f64 = 0.7;
const PASSING_SCORE_FLOOR: f64 = 70.0;
const PASSING_SCORE_CEILING: f64 = 100.0;

/// Scores a plan from its base-case retirement rows and the ensemble success
/// rate (in percent).
pub fn assess_plan(
    config: &ScenarioConfig,
    ret: &[RetirementYearRecord],
    retirement_start_balance: f64,
    success_rate: f64,
) -> PlanAssessment {
    let ending = ret.last().map(|r| r.assets).unwrap_or(0.0);
    let reached_plan_end = ret
        .last()
        .is_some_and(|r| r.age >= config.planning_age && ending > 0.0);

    if !reached_plan_end {
        let score = (success_rate * FAILING_SCORE_WEIGHT).round().max(0.0) as u32;
        let verdict = match ret.iter().position(|r| r.assets <= 0.0) {
            Some(idx) => format!(
                "Portfolio depleted at age {}",
                config.retirement_age + idx as u32
            ),
            None => "Portfolio depleted".to_string(),
        };
        return PlanAssessment { score, verdict };
    }

    let coverage = coverage_ratio(config, retirement_start_balance);
    let raw = (success_component(success_rate) + coverage_component(coverage)).round();
    let score = raw.clamp(PASSING_SCORE_FLOOR, PASSING_SCORE_CEILING) as u32;

    let pct_of_start = if retirement_start_balance > 0.0 {
        (ending / retirement_start_balance * 100.0).round()
    } else {
        0.0
    };
    let verdict = format!(
        "Portfolio lasts to age {}. Ending: {} ({pct_of_start}%)",
        config.planning_age,
        format_dollars(ending)
    );

    PlanAssessment { score, verdict }
}

fn success_component(success_rate: f64) -> f64 {
    match success_rate {
        s if s >= 95.0 => 60.0,
        s if s >= 90.0 => 55.0,
        s if s >= 85.0 => 50.0,
        s if s >= 80.0 => 45.0,
        s if s >= 70.0 => 40.0,
        s if s >= 60.0 => 35.0,
        s => (s * 0.5).round(),
    }
}

fn coverage_component(coverage: f64) -> f64 {
    match coverage {
        c if c >= 1.5 => 40.0,
        c if c >= 1.25 => 35.0,
        c if c >= 1.0 => 30.0,
        c if c >= 0.85 => 25.0,
        c if c >= 0.7 => 20.0,
        c => (c * 25.0).round(),
    }
}

/// Retirement-start balance over 25x the average yearly spending shortfall
/// left after benefit income.
fn coverage_ratio(config: &ScenarioConfig, retirement_start_balance: f64) -> f64 {
    let years = config.planning_age.saturating_sub(config.retirement_age);
    if years == 0 {
        return UNLIMITED_COVERAGE;
    }

    let total_shortfall: f64 = (config.retirement_age..config.planning_age)
        .map(|age| {
            let spending = config.annual_expenses + config.healthcare_for_age(age);
            (spending - benefit_income(config, age)).max(0.0)
        })
        .sum();

    let required = total_shortfall / f64::from(years) * COVERAGE_MULTIPLE;
    if required > 0.0 {
        retirement_start_balance / required
    } else {
        UNLIMITED_COVERAGE
    }
}

fn format_dollars(amount: f64) -> String {
    let whole = amount.round().abs() as u64;
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(age: u32, assets: f64) -> RetirementYearRecord {
        RetirementYearRecord {
            year: 2025,
            age,
            assets,
            withdrawal_gross: 0.0,
            withdrawal_after_tax: 0.0,
            taxes_paid: 0.0,
            income: 0.0,
            healthcare_cost: 0.0,
            p10: 0.0,
            p90: 0.0,
        }
    }

    fn short_config() -> ScenarioConfig {
        let mut config = ScenarioConfig::default();
        config.current_age = 60;
        config.retirement_age = 65;
        config.planning_age = 67;
        config.annual_expenses = 40_000.0;
        config.healthcare_cost = 0.0;
        config.retirement_income.social_security[0].monthly_amount = 0.0;
        config.retirement_income.social_security[1].monthly_amount = 0.0;
        config
    }

    #[test]
    fn depleted_plan_reports_first_zero_age() {
        let config = short_config();
        let ret = vec![row(65, 30_000.0), row(66, 0.0)];
        let assessment = assess_plan(&config, &ret, 60_000.0, 42.0);
        assert_eq!(assessment.score, 29);
        assert_eq!(assessment.verdict, "Portfolio depleted at age 66");
    }

    #[test]
    fn short_path_without_zero_row_is_generic_depletion() {
        let config = short_config();
        let ret = vec![row(65, 30_000.0)];
        let assessment = assess_plan(&config, &ret, 60_000.0, 100.0);
        assert_eq!(assessment.score, 70);
        assert_eq!(assessment.verdict, "Portfolio depleted");
    }

    #[test]
    fn passing_plan_combines_success_and_coverage() {
        let config = short_config();
        let ret = vec![row(65, 1_900_000.0), row(66, 1_800_000.0), row(67, 1_700_000.0)];
        // Shortfall 40,000/yr -> requires 1,000,000; coverage 2.0.
        let assessment = assess_plan(&config, &ret, 2_000_000.0, 96.0);
        assert_eq!(assessment.score, 100);
        assert_eq!(
            assessment.verdict,
            "Portfolio lasts to age 67. Ending: $1,700,000 (85%)"
        );
    }

    #[test]
    fn passing_plan_score_is_floored_at_seventy() {
        let config = short_config();
        let ret = vec![row(65, 300_000.0), row(66, 200_000.0), row(67, 100_000.0)];
        // Coverage 0.4 -> 10 points; success 50% -> 25 points.
        let assessment = assess_plan(&config, &ret, 400_000.0, 50.0);
        assert_eq!(assessment.score, 70);
    }

    #[test]
    fn component_steps() {
        assert_eq!(success_component(95.0), 60.0);
        assert_eq!(success_component(89.9), 50.0);
        assert_eq!(success_component(61.0), 35.0);
        assert_eq!(success_component(59.0), 30.0);
        assert_eq!(coverage_component(1.5), 40.0);
        assert_eq!(coverage_component(1.1), 30.0);
        assert_eq!(coverage_component(0.7), 20.0);
        assert_eq!(coverage_component(0.5), 13.0);
    }

    #[test]
    fn coverage_is_unlimited_when_benefits_cover_spending() {
        let mut config = short_config();
        config.retirement_income.pension_monthly = [5_000.0, 0.0];
        assert_eq!(coverage_ratio(&config, 100.0), UNLIMITED_COVERAGE);
    }

    #[test]
    fn coverage_excludes_healthcare_after_medicare_age() {
        let mut config = short_config();
        config.healthcare_cost = 12_000.0;
        config.retirement_age = 64;
        // Ages 64, 65, 66: one year pays healthcare.
        let expected_required = (52_000.0 + 40_000.0 + 40_000.0) / 3.0 * 25.0;
        let coverage = coverage_ratio(&config, 1_100_000.0);
        assert!((coverage - 1_100_000.0 / expected_required).abs() < 1e-9);
    }

    #[test]
    fn dollar_formatting_groups_thousands() {
        assert_eq!(format_dollars(0.0), "$0");
        assert_eq!(format_dollars(999.0), "$999");
        assert_eq!(format_dollars(1_000.0), "$1,000");
        assert_eq!(format_dollars(1_234_567.4), "$1,234,567");
    }
}
