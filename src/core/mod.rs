mod engine;
mod household;
mod income;
mod random;
mod returns;
mod scoring;
mod tax;
mod types;
mod withdrawal;

pub use engine::{
    ProjectionError, run_projection, run_projection_cancellable, run_projection_seeded,
};
pub use household::{Earner, Household, PLAN_401K_LIMIT, PersonBalances};
pub use income::{benefit_income, benefit_multiplier};
pub use random::{RandomSource, SeededSource, SequenceSource};
pub use returns::{expected_return, real_return, stock_allocation, volatility};
pub use scoring::assess_plan;
pub use tax::{capital_gains_tax, income_tax, marginal_income_tax};
pub use types::{
    Account, Contributions, DEFAULT_START_YEAR, GlidePath, MEDICARE_AGE, McStats,
    PlanAssessment, Portfolio, ProjectionResult, RUIN_THRESHOLD, RetirementIncome,
    RetirementYearRecord, ScenarioConfig, SemiRetirement, SimulationRun, SocialSecurityBenefit,
    WithdrawalResult, YearRecord,
};
pub use withdrawal::{required_minimum_distribution, withdraw};
