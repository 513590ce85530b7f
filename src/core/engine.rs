use super::solver::{monthly_rate, solve_emi};
use super::types::{
    AmortizationPoint, ChartPoint, SimulationError, SimulationInput, SimulationOutput,
    SimulationSummary,
};

/// Safety ceiling for the month-stepping loops: five times the nominal
/// tenure. An EMI barely above interest-only amortizes glacially; the bound
/// guarantees termination and the partial totals are returned as-is.
pub(crate) fn month_ceiling(tenure_years: f64) -> u32 {
    (tenure_years * 12.0 * 5.0).ceil() as u32
}

/// Resolve the EMI actually used for a simulation: the explicit one when
/// positive, otherwise the annuity solution for the loan fields.
pub(crate) fn resolve_emi(inputs: &SimulationInput) -> Result<f64, SimulationError> {
    let emi = if inputs.monthly_emi > 0.0 {
        inputs.monthly_emi
    } else {
        solve_emi(inputs.principal, inputs.interest_rate, inputs.tenure_years)
            .map_err(|_| SimulationError::InvalidLoan)?
    };

    let rate = monthly_rate(inputs.interest_rate);
    if !emi.is_finite() || emi <= 0.0 || emi <= inputs.principal * rate {
        return Err(SimulationError::EmiTooLow);
    }
    Ok(emi)
}

#[derive(Debug)]
struct LoanTrack {
    /// Post-payment balance per month, floored at 0; index 0 holds the
    /// starting principal.
    balances: Vec<f64>,
    schedule: Vec<AmortizationPoint>,
    total_interest: f64,
    months: u32,
}

/// Step a loan balance forward one month at a time under a fixed EMI, with an
/// optional extra lump sum after every 12th regular payment. Stops at payoff
/// or at `month_cap`. The detailed schedule is only recorded on request;
/// the prepayment track needs balances and totals alone.
fn amortize(
    principal: f64,
    rate: f64,
    emi: f64,
    annual_prepayment: f64,
    month_cap: u32,
    record_schedule: bool,
) -> LoanTrack {
    let mut balance = principal;
    let mut total_interest = 0.0;
    let mut balances = vec![principal];
    let mut schedule = Vec::new();
    let mut month = 0_u32;

    while balance > 0.0 && month < month_cap {
        month += 1;
        let interest_paid = balance * rate;
        let principal_paid = emi - interest_paid;
        balance -= principal_paid;
        total_interest += interest_paid;

        if annual_prepayment > 0.0 && month % 12 == 0 {
            balance -= annual_prepayment;
        }

        balances.push(balance.max(0.0));
        if record_schedule {
            schedule.push(AmortizationPoint {
                month,
                principal_paid,
                interest_paid,
                ending_balance: balance.max(0.0),
                total_interest,
            });
        }
    }

    LoanTrack {
        balances,
        schedule,
        total_interest,
        months: month,
    }
}

#[derive(Debug)]
struct SipTrack {
    /// Corpus value per month; index 0 is the empty starting corpus.
    nominal: Vec<f64>,
    real: Vec<f64>,
}

/// Compound a recurring monthly contribution. The real track deflates the
/// compounded value every month, so inflation erodes growth continuously
/// rather than as a single end-of-horizon discount.
fn project_sip(
    contribution: f64,
    sip_rate: f64,
    inflation_rate: f64,
    horizon_months: u32,
) -> SipTrack {
    let mut nominal = Vec::with_capacity(horizon_months as usize + 1);
    let mut real = Vec::with_capacity(horizon_months as usize + 1);
    nominal.push(0.0);
    real.push(0.0);

    let mut nominal_corpus = 0.0;
    let mut real_corpus = 0.0;
    for _ in 1..=horizon_months {
        nominal_corpus = (nominal_corpus + contribution) * (1.0 + sip_rate);
        real_corpus = ((real_corpus + contribution) * (1.0 + sip_rate)) / (1.0 + inflation_rate);
        nominal.push(nominal_corpus);
        real.push(real_corpus);
    }

    SipTrack { nominal, real }
}

/// Run the dual-track simulation: the loan amortized twice (without and with
/// the annual prepayment, both at the same EMI) and the SIP projected over
/// the base track's horizon, combined into one per-month series.
pub fn run_simulation(inputs: &SimulationInput) -> Result<SimulationOutput, SimulationError> {
    if inputs.principal <= 0.0 || inputs.interest_rate < 0.0 || inputs.tenure_years <= 0.0 {
        return Err(SimulationError::InvalidLoan);
    }

    let emi = resolve_emi(inputs)?;
    let loan_rate = monthly_rate(inputs.interest_rate);
    let cap = month_ceiling(inputs.tenure_years);

    let base = amortize(inputs.principal, loan_rate, emi, 0.0, cap, true);
    let prepayment = amortize(
        inputs.principal,
        loan_rate,
        emi,
        inputs.extra_annual_prepayment,
        cap,
        false,
    );
    let sip = project_sip(
        inputs.monthly_sip,
        monthly_rate(inputs.sip_return_rate),
        monthly_rate(inputs.inflation_rate),
        base.months,
    );

    let mut chart_data = Vec::with_capacity(base.months as usize + 1);
    for month in 0..=base.months {
        let i = month as usize;
        chart_data.push(ChartPoint {
            month,
            base_loan_balance: base.balances.get(i).copied().unwrap_or(0.0),
            prepayment_loan_balance: prepayment.balances.get(i).copied().unwrap_or(0.0),
            sip_nominal_corpus: sip.nominal.get(i).copied().unwrap_or(0.0),
            sip_real_corpus: sip.real.get(i).copied().unwrap_or(0.0),
        });
    }

    // First month the corpus could retire the still-outstanding prepayment
    // balance. A balance already at 0 is not a crossing.
    let loan_free_month = chart_data
        .iter()
        .find(|p| {
            p.prepayment_loan_balance > 0.0 && p.sip_nominal_corpus >= p.prepayment_loan_balance
        })
        .map(|p| p.month);

    let summary = SimulationSummary {
        total_interest_paid_base: base.total_interest,
        total_interest_paid_with_prepayment: prepayment.total_interest,
        interest_saved: base.total_interest - prepayment.total_interest,
        tenure_reduced_months: base.months as i64 - prepayment.months as i64,
        final_sip_corpus_nominal: sip.nominal.last().copied().unwrap_or(0.0),
        final_sip_corpus_real: sip.real.last().copied().unwrap_or(0.0),
        loan_free_month,
    };

    Ok(SimulationOutput {
        chart_data,
        amortization_data: base.schedule,
        summary,
    })
}
