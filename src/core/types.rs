use std::fmt;

use serde::Serialize;

/// The full set of user-facing simulation parameters. Rates are annual
/// percents; `monthly_emi == 0` means "derive it from the other three loan
/// fields".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationInput {
    pub principal: f64,
    pub interest_rate: f64,
    pub tenure_years: f64,
    pub monthly_emi: f64,
    pub extra_annual_prepayment: f64,
    pub monthly_sip: f64,
    pub sip_return_rate: f64,
    pub inflation_rate: f64,
}

/// One ledger row of the base (no-prepayment) amortization schedule.
/// `total_interest` is cumulative up to and including this month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationPoint {
    pub month: u32,
    pub principal_paid: f64,
    pub interest_paid: f64,
    pub ending_balance: f64,
    pub total_interest: f64,
}

/// One month of the combined chart series. All four values share the same
/// month index; tracks that finish earlier are padded with 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub month: u32,
    pub base_loan_balance: f64,
    pub prepayment_loan_balance: f64,
    pub sip_nominal_corpus: f64,
    pub sip_real_corpus: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    pub total_interest_paid_base: f64,
    pub total_interest_paid_with_prepayment: f64,
    pub interest_saved: f64,
    pub tenure_reduced_months: i64,
    pub final_sip_corpus_nominal: f64,
    pub final_sip_corpus_real: f64,
    pub loan_free_month: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOutput {
    pub chart_data: Vec<ChartPoint>,
    pub amortization_data: Vec<AmortizationPoint>,
    pub summary: SimulationSummary,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum RiskLevel {
    Conservative,
    Moderate,
    Aggressive,
}

/// The two fields a strategy reallocates; the UI splices these back into the
/// active input state when a strategy is applied.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyInputs {
    pub extra_annual_prepayment: f64,
    pub monthly_sip: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationStrategy {
    pub name: String,
    pub description: String,
    pub risk_level: RiskLevel,
    pub inputs: StrategyInputs,
    pub results: SimulationSummary,
}

/// Why a solver entry point could not produce a finite, positive answer.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SolveError {
    /// Inputs outside the solvable domain (non-positive principal or tenure,
    /// negative rate, non-positive EMI).
    InvalidInput,
    /// EMI does not cover the first month's interest; the balance never falls.
    NeverAmortizes,
    /// Total payments do not even cover principal, so no rate in range fits.
    TargetUnreachable,
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::InvalidInput => write!(f, "loan parameters are out of range"),
            SolveError::NeverAmortizes => write!(
                f,
                "EMI does not cover the first month's interest; the loan would never be repaid"
            ),
            SolveError::TargetUnreachable => write!(
                f,
                "total payments do not cover the principal; no interest rate fits"
            ),
        }
    }
}

/// Why the orchestrator refused to simulate.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SimulationError {
    /// `principal <= 0`, `interest_rate < 0` or `tenure_years <= 0`.
    InvalidLoan,
    /// Explicit or derived EMI is non-finite, non-positive, or at most the
    /// first month's interest.
    EmiTooLow,
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::InvalidLoan => {
                write!(f, "loan parameters are incomplete or invalid")
            }
            SimulationError::EmiTooLow => {
                write!(f, "EMI is too low to cover the monthly interest")
            }
        }
    }
}
