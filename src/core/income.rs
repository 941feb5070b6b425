use super::types::{PENSION_START_AGE, ScenarioConfig};

/// Scale factor applied to a Social-Security-style benefit claimed at `claim_age`,
/// relative to the reference claim age of 67.
pub fn benefit_multiplier(claim_age: u32) -> f64 {
    let age = f64::from(claim_age);
    if claim_age <= 62 {
        0.70
    } else if claim_age >= 70 {
        1.24
    } else if claim_age < 67 {
        0.70 + (age - 62.0) * 0.06
    } else {
        1.00 + (age - 67.0) * 0.08
    }
}

/// Annual Social-Security-style and pension income received at `age`.
pub fn benefit_income(config: &ScenarioConfig, age: u32) -> f64 {
    let benefits = &config.retirement_income;
    let mut income = 0.0;

    for benefit in &benefits.social_security {
        if age >= benefit.claim_age {
            income += benefit.monthly_amount * benefit_multiplier(benefit.claim_age) * 12.0;
        }
    }

    if age >= PENSION_START_AGE {
        income += benefits.pension_monthly.iter().sum::<f64>() * 12.0;
    }

    income
}

/// All income received in a decumulation year, including semi-retirement
/// earnings while that window is still open.
pub fn retirement_year_income(config: &ScenarioConfig, age: u32) -> f64 {
    let earned = match config.active_semi_retirement() {
        Some(semi) if config.is_semi_retired(age) => semi.income,
        _ => 0.0,
    };
    earned + benefit_income(config, age)
}
