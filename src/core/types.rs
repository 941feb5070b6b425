use serde::Serialize;

/// Age at which the healthcare surcharge stops and pension-style benefits begin.
pub const MEDICARE_AGE: u32 = 65;
pub const PENSION_START_AGE: u32 = 65;

/// A path whose total balance falls to this level or below is treated as ruined.
pub const RUIN_THRESHOLD: f64 = 10_000.0;

pub const DEFAULT_START_YEAR: i32 = 2025;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Account {
    Roth,
    Hsa,
    Traditional,
    Brokerage,
    Cash,
}

/// Five independently taxed balances. Also used as a per-account amount vector
/// (e.g. the breakdown of a withdrawal).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Portfolio {
    pub roth: f64,
    pub hsa: f64,
    pub traditional: f64,
    pub brokerage: f64,
    pub cash: f64,
}

impl Portfolio {
    pub fn total(&self) -> f64 {
        self.roth + self.hsa + self.traditional + self.brokerage + self.cash
    }

    pub fn balance(&self, account: Account) -> f64 {
        match account {
            Account::Roth => self.roth,
            Account::Hsa => self.hsa,
            Account::Traditional => self.traditional,
            Account::Brokerage => self.brokerage,
            Account::Cash => self.cash,
        }
    }

    pub fn balance_mut(&mut self, account: Account) -> &mut f64 {
        match account {
            Account::Roth => &mut self.roth,
            Account::Hsa => &mut self.hsa,
            Account::Traditional => &mut self.traditional,
            Account::Brokerage => &mut self.brokerage,
            Account::Cash => &mut self.cash,
        }
    }

    /// Applies one year of growth at `rate` to every account. A draw below -100%
    /// wipes the balance instead of driving it negative.
    pub fn grow(&mut self, rate: f64) {
        let factor = (1.0 + rate).max(0.0);
        self.roth *= factor;
        self.hsa *= factor;
        self.traditional *= factor;
        self.brokerage *= factor;
        self.cash *= factor;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlidePath {
    pub retirement_age: u32,
    pub transition_years: u32,
    pub stock_pct_accumulation: f64,
    pub stock_pct_retirement: f64,
}

/// Annual contributions by destination account while working full time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Contributions {
    pub traditional: f64,
    pub roth: f64,
    pub hsa: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemiRetirement {
    /// Zero disables the phase entirely.
    pub start_age: u32,
    pub income: f64,
    pub savings_rate: f64,
}

impl SemiRetirement {
    pub fn annual_saving(&self) -> f64 {
        self.income * self.savings_rate
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SocialSecurityBenefit {
    /// Monthly benefit at the reference claim age of 67.
    pub monthly_amount: f64,
    pub claim_age: u32,
}

impl Default for SocialSecurityBenefit {
    fn default() -> Self {
        Self {
            monthly_amount: 0.0,
            claim_age: 67,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RetirementIncome {
    pub social_security: [SocialSecurityBenefit; 2],
    pub pension_monthly: [f64; 2],
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    pub current_age: u32,
    pub retirement_age: u32,
    pub planning_age: u32,
    pub start_year: i32,
    pub annual_expenses: f64,
    pub healthcare_cost: f64,
    pub inflation_rate: f64,
    pub stock_pct_accumulation: f64,
    pub stock_pct_retirement: f64,
    pub transition_years: u32,
    pub num_simulations: u32,
    pub semi_retirement: Option<SemiRetirement>,
    pub initial_portfolio: Portfolio,
    pub contributions: Contributions,
    pub retirement_income: RetirementIncome,
}

impl ScenarioConfig {
    pub fn glide_path(&self) -> GlidePath {
        GlidePath {
            retirement_age: self.retirement_age,
            transition_years: self.transition_years,
            stock_pct_accumulation: self.stock_pct_accumulation,
            stock_pct_retirement: self.stock_pct_retirement,
        }
    }

    pub fn has_valid_ages(&self) -> bool {
        self.retirement_age >= self.current_age && self.planning_age > self.retirement_age
    }

    /// Semi-retirement settings, or `None` when the phase is switched off.
    pub fn active_semi_retirement(&self) -> Option<&SemiRetirement> {
        self.semi_retirement.as_ref().filter(|s| s.start_age > 0)
    }

    pub fn is_semi_retired(&self, age: u32) -> bool {
        self.active_semi_retirement()
            .is_some_and(|s| age >= s.start_age && age < self.retirement_age)
    }

    pub fn healthcare_for_age(&self, age: u32) -> f64 {
        if age < MEDICARE_AGE {
            self.healthcare_cost
        } else {
            0.0
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            current_age: 35,
            retirement_age: 65,
            planning_age: 90,
            start_year: DEFAULT_START_YEAR,
            annual_expenses: 60_000.0,
            healthcare_cost: 12_000.0,
            inflation_rate: 0.03,
            stock_pct_accumulation: 0.90,
            stock_pct_retirement: 0.60,
            transition_years: 10,
            num_simulations: 10_000,
            semi_retirement: None,
            initial_portfolio: Portfolio {
                roth: 50_000.0,
                hsa: 10_000.0,
                traditional: 125_000.0,
                brokerage: 0.0,
                cash: 25_000.0,
            },
            contributions: Contributions {
                traditional: 21_000.0,
                roth: 14_000.0,
                hsa: 4_150.0,
            },
            retirement_income: RetirementIncome {
                social_security: [
                    SocialSecurityBenefit {
                        monthly_amount: 2_500.0,
                        claim_age: 67,
                    },
                    SocialSecurityBenefit {
                        monthly_amount: 2_000.0,
                        claim_age: 67,
                    },
                ],
                pension_monthly: [0.0, 0.0],
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WithdrawalResult {
    pub gross_withdrawn: f64,
    pub after_tax_proceeds: f64,
    pub taxes_paid: f64,
    pub resulting_portfolio: Portfolio,
    /// Amount debited from each account, including forced and emergency draws.
    pub per_account: Portfolio,
    pub ordinary_income_realized: f64,
    pub capital_gains_realized: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub year: i32,
    pub age: u32,
    pub assets: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementYearRecord {
    pub year: i32,
    pub age: u32,
    pub assets: f64,
    pub withdrawal_gross: f64,
    pub withdrawal_after_tax: f64,
    pub taxes_paid: f64,
    pub income: f64,
    pub healthcare_cost: f64,
    pub p10: f64,
    pub p90: f64,
}

/// One ensemble member's retirement-phase balances, padded with zeros after ruin.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRun {
    pub balances: Vec<f64>,
    pub success: bool,
}

impl SimulationRun {
    pub fn final_balance(&self) -> f64 {
        self.balances.last().copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McStats {
    pub success_rate_percent: f64,
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanAssessment {
    pub score: u32,
    pub verdict: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub assets: f64,
    pub score: u32,
    pub detail: String,
    pub yearly: Vec<YearRecord>,
    pub ret: Vec<RetirementYearRecord>,
    pub mc_stats: Option<McStats>,
}

impl ProjectionResult {
    pub(crate) fn invalid_ages() -> Self {
        Self {
            assets: 0.0,
            score: 0,
            detail: "Invalid ages".to_string(),
            yearly: Vec::new(),
            ret: Vec::new(),
            mc_stats: None,
        }
    }
}
