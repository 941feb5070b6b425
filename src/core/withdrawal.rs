use super::tax::{capital_gains_tax, income_tax, marginal_income_tax};
use super::types::{Account, Portfolio, WithdrawalResult};

/// Flat penalty on HSA money used for non-healthcare spending.
pub const HSA_EARLY_WITHDRAWAL_PENALTY: f64 = 0.20;
/// Share of an emergency account drain credited as spendable cash.
pub const EMERGENCY_AFTER_TAX_SHARE: f64 = 0.70;
/// Unmet need above which every remaining account is drained.
pub const EMERGENCY_TRIGGER: f64 = 1_000.0;

pub const RMD_START_AGE: u32 = 73;
const RMD_LAST_TABLE_AGE: u32 = 90;
/// Uniform lifetime divisors for ages 73 through 90.
const RMD_DIVISORS: [f64; 18] = [
    26.5, 25.5, 24.6, 23.7, 22.9, 22.0, 21.1, 20.2, 19.4, 18.5, 17.7, 16.8, 16.0, 15.2, 14.4, 13.7,
    12.9, 12.2,
];
const RMD_FALLBACK_DIVISOR: f64 = 11.5;

const GROSS_UP_ITERATIONS: usize = 5;
const GROSS_UP_TOLERANCE: f64 = 100.0;
const BROKERAGE_GROSS_UP_SEED: f64 = 1.2;
const TRADITIONAL_GROSS_UP_SEED: f64 = 1.3;

const EMERGENCY_DRAIN_ORDER: [Account; 3] =
    [Account::Roth, Account::Traditional, Account::Brokerage];

pub fn rmd_divisor(age: u32) -> f64 {
    if age < RMD_START_AGE {
        return RMD_FALLBACK_DIVISOR;
    }
    let idx = (age.min(RMD_LAST_TABLE_AGE) - RMD_START_AGE) as usize;
    RMD_DIVISORS[idx]
}

pub fn required_minimum_distribution(balance: f64, age: u32) -> f64 {
    if age < RMD_START_AGE || balance <= 0.0 {
        return 0.0;
    }
    balance / rmd_divisor(age)
}

/// Running state of one waterfall pass over a working copy of the portfolio.
struct Ledger {
    accounts: Portfolio,
    taken: Portfolio,
    gross: f64,
    after_tax: f64,
    remaining: f64,
    ordinary_income: f64,
    capital_gains: f64,
}

impl Ledger {
    fn new(portfolio: &Portfolio, cash_needed: f64) -> Self {
        Self {
            accounts: *portfolio,
            taken: Portfolio::default(),
            gross: 0.0,
            after_tax: 0.0,
            remaining: cash_needed,
            ordinary_income: 0.0,
            capital_gains: 0.0,
        }
    }

    /// Removes up to `amount` from `account` and returns what was actually taken.
    fn debit(&mut self, account: Account, amount: f64) -> f64 {
        let balance = self.accounts.balance_mut(account);
        let taken = amount.min(*balance).max(0.0);
        *balance -= taken;
        *self.taken.balance_mut(account) += taken;
        self.gross += taken;
        taken
    }

    fn credit_spendable(&mut self, net: f64) {
        self.after_tax += net;
        self.remaining -= net;
    }

    fn balance(&self, account: Account) -> f64 {
        self.accounts.balance(account)
    }
}

/// Fixed-point search for the gross amount whose after-tax value covers `target_net`.
/// Stops after a bounded number of passes; the last candidate is used as-is.
fn solve_gross_for_net(
    target_net: f64,
    available: f64,
    seed_factor: f64,
    tax_on: impl Fn(f64) -> f64,
) -> f64 {
    let mut candidate = target_net * seed_factor;
    for _ in 0..GROSS_UP_ITERATIONS {
        let gross = candidate.min(available);
        let net = gross - tax_on(gross);
        if (net - target_net).abs() < GROSS_UP_TOLERANCE || net <= 0.0 {
            break;
        }
        candidate = target_net * (gross / net);
    }
    candidate.min(available)
}

/// Funds `cash_needed` of after-tax spending from `portfolio`.
///
/// Accounts are tapped in a fixed order: HSA for healthcare, any required
/// minimum distribution, Roth, brokerage, traditional, and finally an
/// emergency drain of whatever is left. The input is not modified; the
/// debited balances are returned in `resulting_portfolio`.
pub fn withdraw(
    cash_needed: f64,
    portfolio: &Portfolio,
    age: u32,
    healthcare_need: f64,
    other_taxable_income: f64,
) -> WithdrawalResult {
    let mut ledger = Ledger::new(portfolio, cash_needed);

    if healthcare_need > 0.0 && ledger.remaining > 0.0 {
        let wanted = ledger.remaining.min(healthcare_need);
        let used = ledger.debit(Account::Hsa, wanted);
        ledger.credit_spendable(used);
    }

    let rmd = required_minimum_distribution(ledger.balance(Account::Traditional), age);
    if rmd > 0.0 {
        let forced = ledger.debit(Account::Traditional, rmd);
        ledger.ordinary_income += forced;
    }

    if ledger.remaining > 0.0 && ledger.balance(Account::Roth) > 0.0 {
        let wanted = ledger.remaining;
        let used = ledger.debit(Account::Roth, wanted);
        ledger.credit_spendable(used);
    }

    if ledger.remaining > 0.0 && ledger.balance(Account::Brokerage) > 0.0 {
        let income_before = other_taxable_income + ledger.ordinary_income;
        let gross = solve_gross_for_net(
            ledger.remaining,
            ledger.balance(Account::Brokerage),
            BROKERAGE_GROSS_UP_SEED,
            |g| capital_gains_tax(g, income_before),
        );
        let used = ledger.debit(Account::Brokerage, gross);
        ledger.capital_gains += used;

        let cg_tax = capital_gains_tax(ledger.capital_gains, income_before);
        ledger.credit_spendable(used - cg_tax);
    }

    if ledger.remaining > 0.0 && ledger.balance(Account::Traditional) > 0.0 {
        let income_before = other_taxable_income + ledger.ordinary_income;
        let gross = solve_gross_for_net(
            ledger.remaining,
            ledger.balance(Account::Traditional),
            TRADITIONAL_GROSS_UP_SEED,
            |g| marginal_income_tax(income_before, g),
        );
        let used = ledger.debit(Account::Traditional, gross);
        ledger.ordinary_income += used;

        // Includes tax on any forced distribution taken above.
        let step_tax = marginal_income_tax(other_taxable_income, ledger.ordinary_income);
        ledger.credit_spendable(used - step_tax);
    }

    if ledger.remaining > EMERGENCY_TRIGGER {
        emergency_drain(&mut ledger, other_taxable_income);
    }

    let taxes_paid = income_tax(other_taxable_income + ledger.ordinary_income)
        - income_tax(other_taxable_income)
        + capital_gains_tax(
            ledger.capital_gains,
            other_taxable_income + ledger.ordinary_income,
        );

    WithdrawalResult {
        gross_withdrawn: ledger.gross,
        after_tax_proceeds: ledger.after_tax,
        taxes_paid,
        resulting_portfolio: ledger.accounts,
        per_account: ledger.taken,
        ordinary_income_realized: ledger.ordinary_income,
        capital_gains_realized: ledger.capital_gains,
    }
}

fn emergency_drain(ledger: &mut Ledger, other_taxable_income: f64) {
    if ledger.balance(Account::Cash) > 0.0 {
        let wanted = ledger.remaining;
        let used = ledger.debit(Account::Cash, wanted);
        ledger.credit_spendable(used);
    }

    if ledger.remaining > 0.0 && ledger.balance(Account::Hsa) > 0.0 {
        let all = ledger.balance(Account::Hsa);
        let used = ledger.debit(Account::Hsa, all);
        let penalty = used * HSA_EARLY_WITHDRAWAL_PENALTY;
        let tax = marginal_income_tax(other_taxable_income + ledger.ordinary_income, used);
        ledger.credit_spendable(used - penalty - tax);
    }

    for account in EMERGENCY_DRAIN_ORDER {
        if ledger.remaining > 0.0 && ledger.balance(account) > 0.0 {
            let all = ledger.balance(account);
            let used = ledger.debit(account, all);
            ledger.credit_spendable(used * EMERGENCY_AFTER_TAX_SHARE);
        }
    }
}
