use super::types::{Contributions, Portfolio};

/// Per-source cap applied to both employee and employer 401(k) amounts.
pub const PLAN_401K_LIMIT: f64 = 23_000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Earner {
    pub income: f64,
    pub employee_401k_pct: f64,
    pub employer_match_pct: f64,
    pub ira_contribution: f64,
    pub hsa_contribution: f64,
}

impl Earner {
    pub fn employee_401k(&self) -> f64 {
        (self.income * self.employee_401k_pct).min(PLAN_401K_LIMIT)
    }

    pub fn employer_401k(&self) -> f64 {
        (self.income * self.employer_match_pct).min(PLAN_401K_LIMIT)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PersonBalances {
    pub roth: f64,
    pub hsa: f64,
    pub plan_401k: f64,
    pub brokerage: f64,
}

/// Two-earner household as entered on the input form.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Household {
    pub earners: [Earner; 2],
    pub balances: [PersonBalances; 2],
    pub joint_cash: f64,
}

impl Household {
    pub fn contributions(&self) -> Contributions {
        self.earners
            .iter()
            .fold(Contributions::default(), |mut acc, e| {
                acc.traditional += e.employee_401k() + e.employer_401k();
                acc.roth += e.ira_contribution;
                acc.hsa += e.hsa_contribution;
                acc
            })
    }

    pub fn portfolio(&self) -> Portfolio {
        let mut portfolio = Portfolio {
            cash: self.joint_cash,
            ..Portfolio::default()
        };
        for b in &self.balances {
            portfolio.roth += b.roth;
            portfolio.hsa += b.hsa;
            portfolio.traditional += b.plan_401k;
            portfolio.brokerage += b.brokerage;
        }
        portfolio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_household() -> Household {
        Household {
            earners: [
                Earner {
                    income: 80_000.0,
                    employee_401k_pct: 0.10,
                    employer_match_pct: 0.05,
                    ira_contribution: 7_000.0,
                    hsa_contribution: 4_150.0,
                },
                Earner {
                    income: 60_000.0,
                    employee_401k_pct: 0.10,
                    employer_match_pct: 0.05,
                    ira_contribution: 7_000.0,
                    hsa_contribution: 0.0,
                },
            ],
            balances: [
                PersonBalances {
                    roth: 50_000.0,
                    hsa: 10_000.0,
                    plan_401k: 75_000.0,
                    brokerage: 0.0,
                },
                PersonBalances {
                    roth: 0.0,
                    hsa: 0.0,
                    plan_401k: 50_000.0,
                    brokerage: 0.0,
                },
            ],
            joint_cash: 25_000.0,
        }
    }

    #[test]
    fn contributions_sum_both_earners() {
        let c = sample_household().contributions();
        assert!((c.traditional - 21_000.0).abs() < 1e-9);
        assert!((c.roth - 14_000.0).abs() < 1e-9);
        assert!((c.hsa - 4_150.0).abs() < 1e-9);
    }

    #[test]
    fn plan_contributions_are_capped_per_source() {
        let earner = Earner {
            income: 400_000.0,
            employee_401k_pct: 0.10,
            employer_match_pct: 0.08,
            ..Earner::default()
        };
        assert_eq!(earner.employee_401k(), PLAN_401K_LIMIT);
        assert_eq!(earner.employer_401k(), PLAN_401K_LIMIT);
    }

    #[test]
    fn portfolio_merges_person_balances_and_cash() {
        let h = sample_household();
        let p = h.portfolio();
        assert_eq!(p.traditional, 125_000.0);
        assert_eq!(p.roth, 50_000.0);
        assert_eq!(p.hsa, 10_000.0);
        assert_eq!(p.cash, 25_000.0);
        assert_eq!(p.total(), 210_000.0);
    }
}
