use super::engine::{resolve_emi, run_simulation};
use super::solver::monthly_rate;
use super::types::{
    OptimizationStrategy, RiskLevel, SimulationInput, SimulationSummary, StrategyInputs,
};

/// Summary of a simulation, or an all-zero summary when the inputs cannot be
/// simulated. Strategy cards always have something to show.
fn summary_or_default(inputs: &SimulationInput) -> SimulationSummary {
    run_simulation(inputs)
        .map(|output| output.summary)
        .unwrap_or_default()
}

/// Walks the loan and the SIP corpus forward together and retires the loan in
/// one shot the first month the corpus covers the remaining balance. The
/// leftover corpus keeps compounding, with continued contributions, up to the
/// later of the original tenure and the closure month, so the final corpus is
/// comparable with the other strategies.
///
/// The real (inflation-adjusted) final corpus is not computed on this path
/// and stays 0.
fn run_sip_closure_simulation(
    base_inputs: &SimulationInput,
    aggressive_inputs: &SimulationInput,
) -> SimulationSummary {
    let loan_rate = monthly_rate(base_inputs.interest_rate);
    let sip_rate = monthly_rate(aggressive_inputs.sip_return_rate);

    let Ok(emi) = resolve_emi(base_inputs) else {
        return summary_or_default(aggressive_inputs);
    };

    let base_tenure_months = (base_inputs.tenure_years * 12.0).round() as u32;
    // Twice the nominal tenure bounds the walk; the corpus may only catch up
    // after the loan would nominally have ended.
    let search_cap = base_tenure_months * 2;

    let mut balance = base_inputs.principal;
    let mut corpus = 0.0;
    let mut total_interest_paid = 0.0;
    let mut closure_month = None;

    for month in 1..=search_cap {
        let interest_for_month = balance * loan_rate;
        total_interest_paid += interest_for_month;
        balance -= emi - interest_for_month;

        if month % 12 == 0 {
            balance -= aggressive_inputs.extra_annual_prepayment;
        }

        corpus = (corpus + aggressive_inputs.monthly_sip) * (1.0 + sip_rate);

        if balance > 0.0 && corpus >= balance {
            closure_month = Some(month);
            break;
        }
        if balance <= 0.0 {
            // Paid off through amortization alone; the corpus stays intact.
            closure_month = Some(month);
            break;
        }
    }

    let Ok(standard_base) = run_simulation(base_inputs) else {
        return summary_or_default(aggressive_inputs);
    };

    let Some(closure_month) = closure_month else {
        // The corpus never caught up within the bound; report the plain
        // simulation of the aggressive inputs instead of closure credit.
        return summary_or_default(aggressive_inputs);
    };

    let mut final_corpus = if balance > 0.0 && corpus >= balance {
        corpus - balance
    } else {
        corpus
    };

    let target_month = base_tenure_months.max(closure_month);
    for _ in closure_month + 1..=target_month {
        final_corpus = (final_corpus + aggressive_inputs.monthly_sip) * (1.0 + sip_rate);
    }

    SimulationSummary {
        total_interest_paid_base: standard_base.summary.total_interest_paid_base,
        total_interest_paid_with_prepayment: total_interest_paid,
        interest_saved: standard_base.summary.total_interest_paid_base - total_interest_paid,
        tenure_reduced_months: base_tenure_months as i64 - closure_month as i64,
        final_sip_corpus_nominal: final_corpus,
        final_sip_corpus_real: 0.0,
        loan_free_month: Some(closure_month),
    }
}

/// Evaluate three deterministic reallocations of an annual surplus against
/// the base scenario: everything to prepayment, an even split, and everything
/// to the SIP (the last judged by the closure search rather than the plain
/// crossover). Returns an empty list when there is no surplus to allocate.
pub fn generate_optimization_strategies(
    base_inputs: &SimulationInput,
    annual_surplus: f64,
) -> Vec<OptimizationStrategy> {
    if annual_surplus <= 0.0 {
        return Vec::new();
    }

    let base_sip = base_inputs.monthly_sip.round();

    let conservative_inputs = SimulationInput {
        extra_annual_prepayment: base_inputs.extra_annual_prepayment + annual_surplus,
        monthly_sip: base_sip,
        ..*base_inputs
    };
    let conservative_results = summary_or_default(&conservative_inputs);

    let moderate_prepayment_increase = (annual_surplus * 0.5).round();
    let moderate_sip_increase = ((annual_surplus - moderate_prepayment_increase) / 12.0).round();
    let moderate_inputs = SimulationInput {
        extra_annual_prepayment: base_inputs.extra_annual_prepayment + moderate_prepayment_increase,
        monthly_sip: base_sip + moderate_sip_increase,
        ..*base_inputs
    };
    let moderate_results = summary_or_default(&moderate_inputs);

    let aggressive_inputs = SimulationInput {
        monthly_sip: base_sip + (annual_surplus / 12.0).round(),
        ..*base_inputs
    };
    let aggressive_results = run_sip_closure_simulation(base_inputs, &aggressive_inputs);

    vec![
        OptimizationStrategy {
            name: "Rapid Prepayment".to_string(),
            description: "Focuses on clearing your loan as fast as possible by allocating 100% \
                          of your surplus to prepayments. Minimizes interest paid."
                .to_string(),
            risk_level: RiskLevel::Conservative,
            inputs: StrategyInputs {
                extra_annual_prepayment: conservative_inputs.extra_annual_prepayment,
                monthly_sip: conservative_inputs.monthly_sip,
            },
            results: conservative_results,
        },
        OptimizationStrategy {
            name: "Balanced Growth".to_string(),
            description: "Splits your surplus between prepayments and SIP investments. A \
                          balanced approach to reducing debt and building wealth."
                .to_string(),
            risk_level: RiskLevel::Moderate,
            inputs: StrategyInputs {
                extra_annual_prepayment: moderate_inputs.extra_annual_prepayment,
                monthly_sip: moderate_inputs.monthly_sip,
            },
            results: moderate_results,
        },
        OptimizationStrategy {
            name: "Wealth Maximizer".to_string(),
            description: "Prioritizes wealth creation by investing your entire surplus into \
                          SIPs. Aims to use the grown corpus to pay off the loan."
                .to_string(),
            risk_level: RiskLevel::Aggressive,
            inputs: StrategyInputs {
                extra_annual_prepayment: aggressive_inputs.extra_annual_prepayment,
                monthly_sip: aggressive_inputs.monthly_sip,
            },
            results: aggressive_results,
        },
    ]
}
