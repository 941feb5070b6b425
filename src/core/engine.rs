use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, debug_span, trace};

use super::income::retirement_year_income;
use super::random::{RandomSource, SeededSource};
use super::returns::{expected_return, real_return, volatility};
use super::scoring::assess_plan;
use super::types::{
    GlidePath, McStats, Portfolio, ProjectionResult, RUIN_THRESHOLD, RetirementYearRecord,
    ScenarioConfig, SimulationRun, WithdrawalResult, YearRecord,
};
use super::withdrawal::withdraw;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("projection cancelled before the ensemble finished")]
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
struct RetirementYearFlows {
    income: f64,
    healthcare: f64,
    withdrawal: WithdrawalResult,
}

/// Deterministic expected path: accumulation rows, decumulation rows and the
/// balance on the first day of retirement.
#[derive(Debug)]
struct BaseCase {
    yearly: Vec<YearRecord>,
    ret: Vec<RetirementYearRecord>,
    retirement_start: Portfolio,
}

/// Runs the base case plus `num_simulations` ensemble members drawing from a
/// single injected stream, one member after another.
pub fn run_projection<R: RandomSource + ?Sized>(
    config: &ScenarioConfig,
    rng: &mut R,
) -> ProjectionResult {
    if !config.has_valid_ages() {
        return ProjectionResult::invalid_ages();
    }
    let _span = projection_span(config).entered();

    let base = project_base_case(config);
    let glide = config.glide_path();
    let runs = (0..config.num_simulations)
        .map(|_| simulate_member(config, &glide, &mut *rng))
        .collect::<Vec<_>>();

    finish_projection(config, base, &runs)
}

/// Runs the ensemble in parallel, giving every member its own stream derived
/// from `seed`. Output depends only on `config` and `seed`.
pub fn run_projection_seeded(config: &ScenarioConfig, seed: u64) -> ProjectionResult {
    if !config.has_valid_ages() {
        return ProjectionResult::invalid_ages();
    }
    let _span = projection_span(config).entered();

    let base = project_base_case(config);
    let glide = config.glide_path();
    let runs = (0..config.num_simulations)
        .into_par_iter()
        .map(|member| {
            let mut rng = SeededSource::for_member(seed, member);
            simulate_member(config, &glide, &mut rng)
        })
        .collect::<Vec<_>>();

    finish_projection(config, base, &runs)
}

/// Same as [`run_projection_seeded`], but members not yet started when
/// `cancel` is raised are skipped and the whole projection is abandoned.
pub fn run_projection_cancellable(
    config: &ScenarioConfig,
    seed: u64,
    cancel: &AtomicBool,
) -> Result<ProjectionResult, ProjectionError> {
    if !config.has_valid_ages() {
        return Ok(ProjectionResult::invalid_ages());
    }
    let _span = projection_span(config).entered();

    let base = project_base_case(config);
    let glide = config.glide_path();
    let runs = (0..config.num_simulations)
        .into_par_iter()
        .map(|member| {
            if cancel.load(Ordering::Relaxed) {
                return Err(ProjectionError::Cancelled);
            }
            let mut rng = SeededSource::for_member(seed, member);
            Ok(simulate_member(config, &glide, &mut rng))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if cancel.load(Ordering::Relaxed) {
        return Err(ProjectionError::Cancelled);
    }

    Ok(finish_projection(config, base, &runs))
}

fn projection_span(config: &ScenarioConfig) -> tracing::Span {
    debug_span!(
        "projection",
        current_age = config.current_age,
        retirement_age = config.retirement_age,
        planning_age = config.planning_age,
        simulations = config.num_simulations
    )
}

fn project_base_case(config: &ScenarioConfig) -> BaseCase {
    let glide = config.glide_path();
    let expected = |age: u32| real_return(expected_return(age, &glide), config.inflation_rate);

    let working_years = (config.retirement_age - config.current_age) as usize;
    let mut yearly = Vec::with_capacity(working_years + 1);
    let retirement_start = accumulate(config, &expected, |age, portfolio| {
        yearly.push(YearRecord {
            year: year_for_age(config, age),
            age,
            assets: portfolio.total().round(),
        });
    });

    let mut portfolio = retirement_start;
    let mut ret = Vec::with_capacity(retirement_years(config));
    for age in config.retirement_age..=config.planning_age {
        let flows = fund_retirement_year(config, &mut portfolio, age);
        portfolio.grow(expected(age));

        let assets = portfolio.total();
        ret.push(RetirementYearRecord {
            year: year_for_age(config, age),
            age,
            assets: assets.round(),
            withdrawal_gross: flows.withdrawal.gross_withdrawn.round(),
            withdrawal_after_tax: flows.withdrawal.after_tax_proceeds.round(),
            taxes_paid: flows.withdrawal.taxes_paid.round(),
            income: flows.income.round(),
            healthcare_cost: flows.healthcare.round(),
            p10: 0.0,
            p90: 0.0,
        });

        if assets <= 0.0 {
            debug!(age, "base case depleted");
            break;
        }
    }

    BaseCase {
        yearly,
        ret,
        retirement_start,
    }
}

/// One ensemble member: stochastic accumulation, then decumulation until the
/// planning age or ruin. Each simulated year consumes exactly one normal draw.
fn simulate_member<R: RandomSource + ?Sized>(
    config: &ScenarioConfig,
    glide: &GlidePath,
    rng: &mut R,
) -> SimulationRun {
    let mut sampled = |age: u32| {
        let nominal = expected_return(age, glide) + rng.standard_normal() * volatility(age, glide);
        nominal - config.inflation_rate
    };

    let mut portfolio = accumulate(config, &mut sampled, |_, _| {});

    let years = retirement_years(config);
    let mut balances = Vec::with_capacity(years);
    for age in config.retirement_age..=config.planning_age {
        let rate = sampled(age);
        fund_retirement_year(config, &mut portfolio, age);
        portfolio.grow(rate);

        let balance = portfolio.total();
        balances.push(balance);
        if balance <= RUIN_THRESHOLD {
            trace!(age, balance, "ensemble member ruined");
            balances.resize(years, 0.0);
            break;
        }
    }

    let success = balances.last().is_some_and(|b| *b > RUIN_THRESHOLD);
    SimulationRun { balances, success }
}

/// Walks the working years from `current_age` to `retirement_age`. The first
/// year is recorded as-is; every later year grows first, then saves or draws.
fn accumulate(
    config: &ScenarioConfig,
    mut rate_for_age: impl FnMut(u32) -> f64,
    mut record: impl FnMut(u32, &Portfolio),
) -> Portfolio {
    let mut portfolio = config.initial_portfolio;
    record(config.current_age, &portfolio);

    for age in config.current_age + 1..=config.retirement_age {
        portfolio.grow(rate_for_age(age));
        apply_working_year(config, &mut portfolio, age);
        record(age, &portfolio);
    }

    portfolio
}

fn apply_working_year(config: &ScenarioConfig, portfolio: &mut Portfolio, age: u32) {
    let Some(semi) = config
        .active_semi_retirement()
        .filter(|_| config.is_semi_retired(age))
    else {
        let c = &config.contributions;
        portfolio.traditional += c.traditional;
        portfolio.roth += c.roth;
        portfolio.hsa += c.hsa;
        return;
    };

    let healthcare = config.healthcare_for_age(age);
    let net_income = semi.income - (config.annual_expenses + healthcare);
    if net_income > 0.0 {
        portfolio.traditional += semi.annual_saving();
    } else {
        let outcome = withdraw(-net_income, portfolio, age, healthcare, semi.income);
        *portfolio = outcome.resulting_portfolio;
    }
}

/// Withdraws this year's spending shortfall from `portfolio` (before growth).
fn fund_retirement_year(
    config: &ScenarioConfig,
    portfolio: &mut Portfolio,
    age: u32,
) -> RetirementYearFlows {
    let income = retirement_year_income(config, age);
    let healthcare = config.healthcare_for_age(age);
    let needed_after_tax = (config.annual_expenses + healthcare - income).max(0.0);

    let withdrawal = withdraw(needed_after_tax, portfolio, age, healthcare, income);
    *portfolio = withdrawal.resulting_portfolio;

    RetirementYearFlows {
        income,
        healthcare,
        withdrawal,
    }
}

fn finish_projection(
    config: &ScenarioConfig,
    mut base: BaseCase,
    runs: &[SimulationRun],
) -> ProjectionResult {
    let (mc_stats, success_rate) = summarize_runs(runs);

    for (idx, row) in base.ret.iter_mut().enumerate() {
        let mut year_balances = runs
            .iter()
            .map(|run| run.balances.get(idx).copied().unwrap_or(0.0))
            .collect::<Vec<_>>();
        year_balances.sort_by(|a, b| a.total_cmp(b));
        row.p10 = floor_index_percentile(&year_balances, 0.1).round().max(0.0);
        row.p90 = floor_index_percentile(&year_balances, 0.9).round().max(0.0);
    }

    let retirement_start_balance = base.retirement_start.total();
    let assessment = assess_plan(config, &base.ret, retirement_start_balance, success_rate);

    ProjectionResult {
        assets: retirement_start_balance.round(),
        score: assessment.score,
        detail: assessment.verdict,
        yearly: base.yearly,
        ret: base.ret,
        mc_stats: Some(mc_stats),
    }
}

/// Success statistics over final balances. Returns the rounded summary and the
/// unrounded success rate in percent.
fn summarize_runs(runs: &[SimulationRun]) -> (McStats, f64) {
    if runs.is_empty() {
        let empty = McStats {
            success_rate_percent: 0.0,
            p10: 0.0,
            p50: 0.0,
            p90: 0.0,
        };
        return (empty, 0.0);
    }

    let successes = runs.iter().filter(|r| r.success).count();
    let success_rate = successes as f64 / runs.len() as f64 * 100.0;
    debug!(successes, simulations = runs.len(), "ensemble finished");

    let mut finals = runs.iter().map(SimulationRun::final_balance).collect::<Vec<_>>();
    finals.sort_by(|a, b| a.total_cmp(b));

    let stats = McStats {
        success_rate_percent: (success_rate * 10.0).round() / 10.0,
        p10: floor_index_percentile(&finals, 0.1).round(),
        p50: floor_index_percentile(&finals, 0.5).round(),
        p90: floor_index_percentile(&finals, 0.9).round(),
    };
    (stats, success_rate)
}

/// Reads `sorted[floor(n * p)]`; no interpolation between neighbours.
fn floor_index_percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64 * p).floor() as usize).min(sorted.len() - 1);
    sorted[idx]
}

fn retirement_years(config: &ScenarioConfig) -> usize {
    (config.planning_age - config.retirement_age) as usize + 1
}

fn year_for_age(config: &ScenarioConfig, age: u32) -> i32 {
    config.start_year + (age - config.current_age) as i32
}
