use axum::{
    Json, Router,
    extract::Query,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    Earner, Household, PersonBalances, ProjectionResult, RetirementIncome, ScenarioConfig,
    SemiRetirement, SocialSecurityBenefit, run_projection_seeded,
};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SEED: u64 = 42;
/// Largest age accepted for any of the three scenario ages.
const MAX_AGE: u32 = 120;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("--{0} must be a finite amount >= 0")]
    InvalidAmount(&'static str),
    #[error("--{0} must be between 0 and 100")]
    PercentOutOfRange(&'static str),
    #[error("--{0} must be <= {max}", max = MAX_AGE)]
    AgeOutOfRange(&'static str),
    #[error("--simulations must be > 0")]
    NoSimulations,
    #[error("--transition-years must be <= --retirement-age")]
    TransitionTooLong,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("failed to encode projection: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(
    name = "nestegg",
    about = "Tax-aware retirement projection (glide path + withdrawal waterfall + Monte Carlo)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the projection API over HTTP.
    Serve {
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Run one projection and print it as JSON.
    Project(ScenarioArgs),
}

/// Scenario inputs as the household enters them. Rates are in percent.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct ScenarioArgs {
    #[arg(long, default_value_t = 35)]
    current_age: u32,
    #[arg(long, default_value_t = 65)]
    retirement_age: u32,
    #[arg(long, default_value_t = 90)]
    planning_age: u32,
    #[arg(long, default_value_t = 2025, help = "Calendar year of the current age")]
    start_year: i32,
    #[arg(long, default_value_t = 60_000.0)]
    annual_expenses: f64,
    #[arg(
        long,
        default_value_t = 12_000.0,
        help = "Annual healthcare cost paid before Medicare age"
    )]
    healthcare_cost: f64,
    #[arg(long, default_value_t = 3.0)]
    inflation_rate: f64,
    #[arg(long, default_value_t = 90.0)]
    stock_pct_accumulation: f64,
    #[arg(long, default_value_t = 60.0)]
    stock_pct_retirement: f64,
    #[arg(long, default_value_t = 10)]
    transition_years: u32,
    #[arg(long, default_value_t = 10_000)]
    simulations: u32,
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    #[arg(long, default_value_t = 0, help = "Age semi-retirement starts; 0 disables it")]
    semi_retire_age: u32,
    #[arg(long, default_value_t = 40_000.0)]
    semi_retire_income: f64,
    #[arg(long, default_value_t = 10.0)]
    semi_retire_savings_rate: f64,

    #[arg(long, default_value_t = 50_000.0)]
    p1_roth_ira: f64,
    #[arg(long, default_value_t = 10_000.0)]
    p1_hsa: f64,
    #[arg(long, default_value_t = 75_000.0)]
    p1_401k: f64,
    #[arg(long, default_value_t = 0.0)]
    p1_brokerage: f64,
    #[arg(long, default_value_t = 0.0)]
    p2_roth_ira: f64,
    #[arg(long, default_value_t = 0.0)]
    p2_hsa: f64,
    #[arg(long, default_value_t = 50_000.0)]
    p2_401k: f64,
    #[arg(long, default_value_t = 0.0)]
    p2_brokerage: f64,
    #[arg(long, default_value_t = 25_000.0)]
    joint_cash: f64,

    #[arg(long, default_value_t = 80_000.0)]
    p1_income: f64,
    #[arg(long, default_value_t = 10.0)]
    p1_401k_contrib_pct: f64,
    #[arg(long, default_value_t = 5.0)]
    p1_employer_match_pct: f64,
    #[arg(long, default_value_t = 7_000.0)]
    p1_ira_contrib: f64,
    #[arg(long, default_value_t = 4_150.0)]
    p1_hsa_contrib: f64,
    #[arg(long, default_value_t = 60_000.0)]
    p2_income: f64,
    #[arg(long, default_value_t = 10.0)]
    p2_401k_contrib_pct: f64,
    #[arg(long, default_value_t = 5.0)]
    p2_employer_match_pct: f64,
    #[arg(long, default_value_t = 7_000.0)]
    p2_ira_contrib: f64,
    #[arg(long, default_value_t = 0.0)]
    p2_hsa_contrib: f64,

    #[arg(long, default_value_t = 2_500.0)]
    p1_ss_month: f64,
    #[arg(long, default_value_t = 67)]
    p1_ss_claim_age: u32,
    #[arg(long, default_value_t = 2_000.0)]
    p2_ss_month: f64,
    #[arg(long, default_value_t = 67)]
    p2_ss_claim_age: u32,
    #[arg(long, default_value_t = 0.0)]
    p1_pension_month: f64,
    #[arg(long, default_value_t = 0.0)]
    p2_pension_month: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    current_age: Option<u32>,
    retirement_age: Option<u32>,
    planning_age: Option<u32>,
    start_year: Option<i32>,
    annual_expenses: Option<f64>,
    healthcare_cost: Option<f64>,
    inflation_rate: Option<f64>,
    stock_pct_accumulation: Option<f64>,
    stock_pct_retirement: Option<f64>,
    transition_years: Option<u32>,
    #[serde(alias = "simulations")]
    num_simulations: Option<u32>,
    seed: Option<u64>,

    semi_retire_age: Option<u32>,
    semi_retire_income: Option<f64>,
    semi_retire_savings_rate: Option<f64>,

    #[serde(alias = "p1RothIRA")]
    p1_roth_ira: Option<f64>,
    #[serde(alias = "p1HSA")]
    p1_hsa: Option<f64>,
    #[serde(rename = "p1_401k")]
    p1_401k: Option<f64>,
    p1_brokerage: Option<f64>,
    #[serde(alias = "p2RothIRA")]
    p2_roth_ira: Option<f64>,
    #[serde(alias = "p2HSA")]
    p2_hsa: Option<f64>,
    #[serde(rename = "p2_401k")]
    p2_401k: Option<f64>,
    p2_brokerage: Option<f64>,
    joint_cash: Option<f64>,

    p1_income: Option<f64>,
    #[serde(rename = "p1_401kContribPct")]
    p1_401k_contrib_pct: Option<f64>,
    p1_employer_match_pct: Option<f64>,
    #[serde(alias = "p1IRAContrib")]
    p1_ira_contrib: Option<f64>,
    #[serde(alias = "p1HSAContrib")]
    p1_hsa_contrib: Option<f64>,
    p2_income: Option<f64>,
    #[serde(rename = "p2_401kContribPct")]
    p2_401k_contrib_pct: Option<f64>,
    p2_employer_match_pct: Option<f64>,
    #[serde(alias = "p2IRAContrib")]
    p2_ira_contrib: Option<f64>,
    #[serde(alias = "p2HSAContrib")]
    p2_hsa_contrib: Option<f64>,

    #[serde(alias = "p1SSMonth")]
    p1_ss_month: Option<f64>,
    #[serde(alias = "p1SSClaimAge")]
    p1_ss_claim_age: Option<u32>,
    #[serde(alias = "p2SSMonth")]
    p2_ss_month: Option<f64>,
    #[serde(alias = "p2SSClaimAge")]
    p2_ss_claim_age: Option<u32>,
    p1_pension_month: Option<f64>,
    p2_pension_month: Option<f64>,
}

#[derive(Debug)]
struct ApiRequest {
    config: ScenarioConfig,
    seed: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    seed: u64,
    simulations: u32,
    #[serde(flatten)]
    result: ProjectionResult,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

fn build_inputs(cli: ScenarioArgs) -> Result<ScenarioConfig, InputError> {
    if cli.simulations == 0 {
        return Err(InputError::NoSimulations);
    }

    let ages = [
        ("current-age", cli.current_age),
        ("retirement-age", cli.retirement_age),
        ("planning-age", cli.planning_age),
    ];
    if let Some((name, _)) = ages.iter().find(|(_, age)| *age > MAX_AGE) {
        return Err(InputError::AgeOutOfRange(*name));
    }

    if cli.transition_years > cli.retirement_age {
        return Err(InputError::TransitionTooLong);
    }

    let amounts = [
        ("annual-expenses", cli.annual_expenses),
        ("healthcare-cost", cli.healthcare_cost),
        ("semi-retire-income", cli.semi_retire_income),
        ("p1-roth-ira", cli.p1_roth_ira),
        ("p1-hsa", cli.p1_hsa),
        ("p1-401k", cli.p1_401k),
        ("p1-brokerage", cli.p1_brokerage),
        ("p2-roth-ira", cli.p2_roth_ira),
        ("p2-hsa", cli.p2_hsa),
        ("p2-401k", cli.p2_401k),
        ("p2-brokerage", cli.p2_brokerage),
        ("joint-cash", cli.joint_cash),
        ("p1-income", cli.p1_income),
        ("p1-ira-contrib", cli.p1_ira_contrib),
        ("p1-hsa-contrib", cli.p1_hsa_contrib),
        ("p2-income", cli.p2_income),
        ("p2-ira-contrib", cli.p2_ira_contrib),
        ("p2-hsa-contrib", cli.p2_hsa_contrib),
        ("p1-ss-month", cli.p1_ss_month),
        ("p2-ss-month", cli.p2_ss_month),
        ("p1-pension-month", cli.p1_pension_month),
        ("p2-pension-month", cli.p2_pension_month),
    ];
    if let Some((name, _)) = amounts
        .iter()
        .find(|(_, value)| !value.is_finite() || *value < 0.0)
    {
        return Err(InputError::InvalidAmount(*name));
    }

    let percents = [
        ("inflation-rate", cli.inflation_rate),
        ("stock-pct-accumulation", cli.stock_pct_accumulation),
        ("stock-pct-retirement", cli.stock_pct_retirement),
        ("semi-retire-savings-rate", cli.semi_retire_savings_rate),
        ("p1-401k-contrib-pct", cli.p1_401k_contrib_pct),
        ("p1-employer-match-pct", cli.p1_employer_match_pct),
        ("p2-401k-contrib-pct", cli.p2_401k_contrib_pct),
        ("p2-employer-match-pct", cli.p2_employer_match_pct),
    ];
    if let Some((name, _)) = percents
        .iter()
        .find(|(_, value)| !(0.0..=100.0).contains(value))
    {
        return Err(InputError::PercentOutOfRange(*name));
    }

    let household = Household {
        earners: [
            Earner {
                income: cli.p1_income,
                employee_401k_pct: cli.p1_401k_contrib_pct / 100.0,
                employer_match_pct: cli.p1_employer_match_pct / 100.0,
                ira_contribution: cli.p1_ira_contrib,
                hsa_contribution: cli.p1_hsa_contrib,
            },
            Earner {
                income: cli.p2_income,
                employee_401k_pct: cli.p2_401k_contrib_pct / 100.0,
                employer_match_pct: cli.p2_employer_match_pct / 100.0,
                ira_contribution: cli.p2_ira_contrib,
                hsa_contribution: cli.p2_hsa_contrib,
            },
        ],
        balances: [
            PersonBalances {
                roth: cli.p1_roth_ira,
                hsa: cli.p1_hsa,
                plan_401k: cli.p1_401k,
                brokerage: cli.p1_brokerage,
            },
            PersonBalances {
                roth: cli.p2_roth_ira,
                hsa: cli.p2_hsa,
                plan_401k: cli.p2_401k,
                brokerage: cli.p2_brokerage,
            },
        ],
        joint_cash: cli.joint_cash,
    };

    Ok(ScenarioConfig {
        current_age: cli.current_age,
        retirement_age: cli.retirement_age,
        planning_age: cli.planning_age,
        start_year: cli.start_year,
        annual_expenses: cli.annual_expenses,
        healthcare_cost: cli.healthcare_cost,
        inflation_rate: cli.inflation_rate / 100.0,
        stock_pct_accumulation: cli.stock_pct_accumulation / 100.0,
        stock_pct_retirement: cli.stock_pct_retirement / 100.0,
        transition_years: cli.transition_years,
        num_simulations: cli.simulations,
        semi_retirement: Some(SemiRetirement {
            start_age: cli.semi_retire_age,
            income: cli.semi_retire_income,
            savings_rate: cli.semi_retire_savings_rate / 100.0,
        }),
        initial_portfolio: household.portfolio(),
        contributions: household.contributions(),
        retirement_income: RetirementIncome {
            social_security: [
                SocialSecurityBenefit {
                    monthly_amount: cli.p1_ss_month,
                    claim_age: cli.p1_ss_claim_age,
                },
                SocialSecurityBenefit {
                    monthly_amount: cli.p2_ss_month,
                    claim_age: cli.p2_ss_claim_age,
                },
            ],
            pension_monthly: [cli.p1_pension_month, cli.p2_pension_month],
        },
    })
}

/// Runs the `project` subcommand and returns the pretty-printed response body.
pub fn project_json(cli: ScenarioArgs) -> Result<String, CliError> {
    let seed = cli.seed;
    let config = build_inputs(cli)?;
    let response = simulate(ApiRequest { config, seed });
    Ok(serde_json::to_string_pretty(&response)?)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/health", get(health_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "projection API listening");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "rejected simulate request");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    match tokio::task::spawn_blocking(move || simulate(request)).await {
        Ok(response) => {
            info!(
                seed = response.seed,
                simulations = response.simulations,
                score = response.result.score,
                "projection served"
            );
            json_response(StatusCode::OK, response)
        }
        Err(err) => {
            warn!(error = %err, "projection task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Projection failed")
        }
    }
}

fn simulate(request: ApiRequest) -> SimulateResponse {
    SimulateResponse {
        seed: request.seed,
        simulations: request.config.num_simulations,
        result: run_projection_seeded(&request.config, request.seed),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload).map_err(|e| e.to_string())
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ApiRequest, InputError> {
    let mut cli = default_cli_for_api();

    macro_rules! overlay {
        ($($field:ident),+ $(,)?) => {
            $(
                if let Some(v) = payload.$field {
                    cli.$field = v;
                }
            )+
        };
    }

    overlay!(
        current_age,
        retirement_age,
        planning_age,
        start_year,
        annual_expenses,
        healthcare_cost,
        inflation_rate,
        stock_pct_accumulation,
        stock_pct_retirement,
        transition_years,
        seed,
        semi_retire_age,
        semi_retire_income,
        semi_retire_savings_rate,
        p1_roth_ira,
        p1_hsa,
        p1_401k,
        p1_brokerage,
        p2_roth_ira,
        p2_hsa,
        p2_401k,
        p2_brokerage,
        joint_cash,
        p1_income,
        p1_401k_contrib_pct,
        p1_employer_match_pct,
        p1_ira_contrib,
        p1_hsa_contrib,
        p2_income,
        p2_401k_contrib_pct,
        p2_employer_match_pct,
        p2_ira_contrib,
        p2_hsa_contrib,
        p1_ss_month,
        p1_ss_claim_age,
        p2_ss_month,
        p2_ss_claim_age,
        p1_pension_month,
        p2_pension_month,
    );
    if let Some(v) = payload.num_simulations {
        cli.simulations = v;
    }

    let seed = cli.seed;
    let config = build_inputs(cli)?;
    Ok(ApiRequest { config, seed })
}

fn default_cli_for_api() -> ScenarioArgs {
    ScenarioArgs {
        current_age: 35,
        retirement_age: 65,
        planning_age: 90,
        start_year: 2025,
        annual_expenses: 60_000.0,
        healthcare_cost: 12_000.0,
        inflation_rate: 3.0,
        stock_pct_accumulation: 90.0,
        stock_pct_retirement: 60.0,
        transition_years: 10,
        simulations: 10_000,
        seed: DEFAULT_SEED,
        semi_retire_age: 0,
        semi_retire_income: 40_000.0,
        semi_retire_savings_rate: 10.0,
        p1_roth_ira: 50_000.0,
        p1_hsa: 10_000.0,
        p1_401k: 75_000.0,
        p1_brokerage: 0.0,
        p2_roth_ira: 0.0,
        p2_hsa: 0.0,
        p2_401k: 50_000.0,
        p2_brokerage: 0.0,
        joint_cash: 25_000.0,
        p1_income: 80_000.0,
        p1_401k_contrib_pct: 10.0,
        p1_employer_match_pct: 5.0,
        p1_ira_contrib: 7_000.0,
        p1_hsa_contrib: 4_150.0,
        p2_income: 60_000.0,
        p2_401k_contrib_pct: 10.0,
        p2_employer_match_pct: 5.0,
        p2_ira_contrib: 7_000.0,
        p2_hsa_contrib: 0.0,
        p1_ss_month: 2_500.0,
        p1_ss_claim_age: 67,
        p2_ss_month: 2_000.0,
        p2_ss_claim_age: 67,
        p1_pension_month: 0.0,
        p2_pension_month: 0.0,
    }
}
