use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    AmortizationPoint, ChartPoint, OptimizationStrategy, SimulationInput, SimulationSummary,
    generate_optimization_strategies, run_simulation, solve_emi, solve_interest_rate, solve_tenure,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

/// Which loan field the caller wants derived from the other three. Exactly
/// one field is "calculated" at a time; the UI toggles this per input group.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiSolveField {
    #[serde(alias = "monthlyEmi", alias = "monthly_emi", alias = "monthlyEMI")]
    Emi,
    #[serde(alias = "tenureYears", alias = "tenure_years", alias = "years")]
    Tenure,
    #[serde(alias = "interestRate", alias = "interest_rate", alias = "rate")]
    InterestRate,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    principal: Option<f64>,
    interest_rate: Option<f64>,
    tenure_years: Option<f64>,
    #[serde(alias = "monthlyEMI")]
    monthly_emi: Option<f64>,
    extra_annual_prepayment: Option<f64>,
    #[serde(alias = "monthlySIP")]
    monthly_sip: Option<f64>,
    sip_return_rate: Option<f64>,
    inflation_rate: Option<f64>,
    solve_for: Option<ApiSolveField>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct OptimizePayload {
    principal: Option<f64>,
    interest_rate: Option<f64>,
    tenure_years: Option<f64>,
    #[serde(alias = "monthlyEMI")]
    monthly_emi: Option<f64>,
    extra_annual_prepayment: Option<f64>,
    #[serde(alias = "monthlySIP")]
    monthly_sip: Option<f64>,
    sip_return_rate: Option<f64>,
    inflation_rate: Option<f64>,
    solve_for: Option<ApiSolveField>,
    annual_surplus: Option<f64>,
}

impl From<&OptimizePayload> for SimulatePayload {
    fn from(value: &OptimizePayload) -> Self {
        SimulatePayload {
            principal: value.principal,
            interest_rate: value.interest_rate,
            tenure_years: value.tenure_years,
            monthly_emi: value.monthly_emi,
            extra_annual_prepayment: value.extra_annual_prepayment,
            monthly_sip: value.monthly_sip,
            sip_return_rate: value.sip_return_rate,
            inflation_rate: value.inflation_rate,
            solve_for: value.solve_for,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "loansim",
    about = "Loan amortization vs. SIP investment simulator"
)]
struct Cli {
    #[arg(long, help = "Outstanding loan principal")]
    principal: f64,
    #[arg(long, help = "Annual loan interest rate in percent, e.g. 8.5")]
    interest_rate: f64,
    #[arg(long, help = "Loan tenure in years")]
    tenure_years: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Fixed monthly EMI; 0 derives it from the other loan fields"
    )]
    monthly_emi: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Extra lump-sum principal payment applied every 12th month"
    )]
    extra_annual_prepayment: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly SIP contribution")]
    monthly_sip: f64,
    #[arg(
        long,
        default_value_t = 12.0,
        help = "Expected annual SIP return in percent"
    )]
    sip_return_rate: f64,
    #[arg(
        long,
        default_value_t = 6.0,
        help = "Expected annual inflation in percent"
    )]
    inflation_rate: f64,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: SimulationInput,
    solved_field: Option<ApiSolveField>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolvedInputs {
    principal: f64,
    interest_rate: f64,
    tenure_years: f64,
    monthly_emi: f64,
    extra_annual_prepayment: f64,
    monthly_sip: f64,
    sip_return_rate: f64,
    inflation_rate: f64,
}

impl From<SimulationInput> for ResolvedInputs {
    fn from(inputs: SimulationInput) -> Self {
        ResolvedInputs {
            principal: inputs.principal,
            interest_rate: inputs.interest_rate,
            tenure_years: inputs.tenure_years,
            monthly_emi: inputs.monthly_emi,
            extra_annual_prepayment: inputs.extra_annual_prepayment,
            monthly_sip: inputs.monthly_sip,
            sip_return_rate: inputs.sip_return_rate,
            inflation_rate: inputs.inflation_rate,
        }
    }
}

/// One calendar year of the amortization schedule: flows summed over the 12
/// months, running totals taken from the year's last row. Display-side
/// aggregation only; the core keeps the monthly ledger.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
struct YearlyAmortizationRow {
    year: u32,
    principal_paid: f64,
    interest_paid: f64,
    total_interest: f64,
    ending_balance: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    inputs: ResolvedInputs,
    solved_field: Option<ApiSolveField>,
    summary: SimulationSummary,
    chart_data: Vec<ChartPoint>,
    amortization_data: Vec<AmortizationPoint>,
    yearly_amortization: Vec<YearlyAmortizationRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OptimizeResponse {
    inputs: ResolvedInputs,
    annual_surplus: f64,
    strategies: Vec<OptimizationStrategy>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_inputs(cli: Cli) -> Result<SimulationInput, String> {
    for (name, value) in [
        ("--principal", cli.principal),
        ("--interest-rate", cli.interest_rate),
        ("--tenure-years", cli.tenure_years),
        ("--monthly-emi", cli.monthly_emi),
        ("--extra-annual-prepayment", cli.extra_annual_prepayment),
        ("--monthly-sip", cli.monthly_sip),
        ("--sip-return-rate", cli.sip_return_rate),
        ("--inflation-rate", cli.inflation_rate),
    ] {
        if !value.is_finite() {
            return Err(format!("{name} must be a finite number"));
        }
    }

    if cli.principal <= 0.0 {
        return Err("--principal must be > 0".to_string());
    }

    if !(0.0..=100.0).contains(&cli.interest_rate) {
        return Err("--interest-rate must be between 0 and 100".to_string());
    }

    if cli.tenure_years <= 0.0 || cli.tenure_years > 100.0 {
        return Err("--tenure-years must be between 0 and 100".to_string());
    }

    if cli.monthly_emi < 0.0 {
        return Err("--monthly-emi must be >= 0".to_string());
    }

    if cli.extra_annual_prepayment < 0.0 {
        return Err("--extra-annual-prepayment must be >= 0".to_string());
    }

    if cli.monthly_sip < 0.0 {
        return Err("--monthly-sip must be >= 0".to_string());
    }

    if !(0.0..=100.0).contains(&cli.sip_return_rate) {
        return Err("--sip-return-rate must be between 0 and 100".to_string());
    }

    if !(0.0..=100.0).contains(&cli.inflation_rate) {
        return Err("--inflation-rate must be between 0 and 100".to_string());
    }

    Ok(SimulationInput {
        principal: cli.principal,
        interest_rate: cli.interest_rate,
        tenure_years: cli.tenure_years,
        monthly_emi: cli.monthly_emi,
        extra_annual_prepayment: cli.extra_annual_prepayment,
        monthly_sip: cli.monthly_sip,
        sip_return_rate: cli.sip_return_rate,
        inflation_rate: cli.inflation_rate,
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route(
            "/api/optimize",
            get(optimize_get_handler).post(optimize_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("loansim HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

async fn optimize_get_handler(Query(payload): Query<OptimizePayload>) -> Response {
    optimize_handler_impl(payload)
}

async fn optimize_post_handler(Json(payload): Json<OptimizePayload>) -> Response {
    optimize_handler_impl(payload)
}

fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let output = match run_simulation(&request.inputs) {
        Ok(output) => output,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let yearly_amortization = aggregate_yearly(&output.amortization_data);
    let response = SimulateResponse {
        inputs: request.inputs.into(),
        solved_field: request.solved_field,
        summary: output.summary,
        chart_data: output.chart_data,
        amortization_data: output.amortization_data,
        yearly_amortization,
    };
    json_response(StatusCode::OK, response)
}

fn optimize_handler_impl(payload: OptimizePayload) -> Response {
    let annual_surplus = payload.annual_surplus.unwrap_or(100_000.0);
    if !annual_surplus.is_finite() {
        return error_response(StatusCode::BAD_REQUEST, "annualSurplus must be finite");
    }

    let request = match api_request_from_payload((&payload).into()) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let strategies = generate_optimization_strategies(&request.inputs, annual_surplus);
    let response = OptimizeResponse {
        inputs: request.inputs.into(),
        annual_surplus,
        strategies,
    };
    json_response(StatusCode::OK, response)
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
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
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.principal {
        cli.principal = v;
    }
    if let Some(v) = payload.interest_rate {
        cli.interest_rate = v;
    }
    if let Some(v) = payload.tenure_years {
        cli.tenure_years = v;
    }
    if let Some(v) = payload.monthly_emi {
        cli.monthly_emi = v;
    }
    if let Some(v) = payload.extra_annual_prepayment {
        cli.extra_annual_prepayment = v;
    }
    if let Some(v) = payload.monthly_sip {
        cli.monthly_sip = v;
    }
    if let Some(v) = payload.sip_return_rate {
        cli.sip_return_rate = v;
    }
    if let Some(v) = payload.inflation_rate {
        cli.inflation_rate = v;
    }

    if let Some(field) = payload.solve_for {
        solve_missing_field(&mut cli, field)?;
    }

    let inputs = build_inputs(cli)?;
    Ok(ApiRequest {
        inputs,
        solved_field: payload.solve_for,
    })
}

/// Fill the designated loan field from the other three. A solver failure is a
/// caller error (the classic case: an EMI below interest-only when solving
/// for tenure), reported as a message for the 400 body.
fn solve_missing_field(cli: &mut Cli, field: ApiSolveField) -> Result<(), String> {
    match field {
        ApiSolveField::Emi => {
            cli.monthly_emi = solve_emi(cli.principal, cli.interest_rate, cli.tenure_years)
                .map_err(|e| e.to_string())?;
        }
        ApiSolveField::Tenure => {
            if cli.monthly_emi <= 0.0 {
                return Err("monthlyEmi must be > 0 when solving for tenure".to_string());
            }
            cli.tenure_years = solve_tenure(cli.principal, cli.interest_rate, cli.monthly_emi)
                .map_err(|e| e.to_string())?;
        }
        ApiSolveField::InterestRate => {
            if cli.monthly_emi <= 0.0 {
                return Err("monthlyEmi must be > 0 when solving for the interest rate".to_string());
            }
            cli.interest_rate =
                solve_interest_rate(cli.principal, cli.tenure_years, cli.monthly_emi)
                    .map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}

fn default_cli_for_api() -> Cli {
    Cli {
        principal: 3_000_000.0,
        interest_rate: 8.5,
        tenure_years: 30.0,
        monthly_emi: 0.0,
        extra_annual_prepayment: 0.0,
        monthly_sip: 0.0,
        sip_return_rate: 12.0,
        inflation_rate: 6.0,
    }
}

fn aggregate_yearly(rows: &[AmortizationPoint]) -> Vec<YearlyAmortizationRow> {
    rows.chunks(12)
        .enumerate()
        .map(|(idx, chunk)| {
            let last = chunk[chunk.len() - 1];
            YearlyAmortizationRow {
                year: idx as u32 + 1,
                principal_paid: chunk.iter().map(|r| r.principal_paid).sum(),
                interest_paid: chunk.iter().map(|r| r.interest_paid).sum(),
                total_interest: last.total_interest,
                ending_balance: last.ending_balance,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    #[test]
    fn build_inputs_accepts_defaults() {
        let inputs = build_inputs(sample_cli()).expect("valid inputs");
        assert_approx(inputs.principal, 3_000_000.0);
        assert_approx(inputs.interest_rate, 8.5);
        assert_approx(inputs.tenure_years, 30.0);
        assert_approx(inputs.monthly_emi, 0.0);
    }

    #[test]
    fn build_inputs_rejects_non_positive_principal() {
        let mut cli = sample_cli();
        cli.principal = 0.0;
        let err = build_inputs(cli).expect_err("must reject zero principal");
        assert!(err.contains("--principal"));
    }

    #[test]
    fn build_inputs_rejects_out_of_range_rates() {
        let mut cli = sample_cli();
        cli.interest_rate = -1.0;
        let err = build_inputs(cli).expect_err("must reject negative rate");
        assert!(err.contains("--interest-rate"));

        let mut cli = sample_cli();
        cli.sip_return_rate = 120.0;
        let err = build_inputs(cli).expect_err("must reject out-of-range SIP rate");
        assert!(err.contains("--sip-return-rate"));
    }

    #[test]
    fn build_inputs_rejects_non_finite_values() {
        let mut cli = sample_cli();
        cli.extra_annual_prepayment = f64::NAN;
        let err = build_inputs(cli).expect_err("must reject NaN");
        assert!(err.contains("--extra-annual-prepayment"));
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
          "principal": 2500000,
          "interestRate": 9.25,
          "tenureYears": 25,
          "monthlyEMI": 0,
          "extraAnnualPrepayment": 50000,
          "monthlySIP": 8000,
          "sipReturnRate": 11,
          "inflationRate": 5.5
        }"#;
        let request = api_request_from_json(json).expect("json should parse");
        let inputs = request.inputs;

        assert_approx(inputs.principal, 2_500_000.0);
        assert_approx(inputs.interest_rate, 9.25);
        assert_approx(inputs.tenure_years, 25.0);
        assert_approx(inputs.extra_annual_prepayment, 50_000.0);
        assert_approx(inputs.monthly_sip, 8_000.0);
        assert_approx(inputs.sip_return_rate, 11.0);
        assert_approx(inputs.inflation_rate, 5.5);
        assert_eq!(request.solved_field, None);
    }

    #[test]
    fn api_request_solves_for_emi() {
        let json = r#"{ "solveFor": "emi" }"#;
        let request = api_request_from_json(json).expect("json should parse");

        assert_eq!(request.solved_field, Some(ApiSolveField::Emi));
        assert_approx_tol(request.inputs.monthly_emi, 23_067.0, 10.0);
    }

    #[test]
    fn api_request_solves_for_tenure() {
        let json = r#"{
          "monthlyEmi": 30000,
          "solveFor": "tenure"
        }"#;
        let request = api_request_from_json(json).expect("json should parse");

        assert_eq!(request.solved_field, Some(ApiSolveField::Tenure));
        assert!(request.inputs.tenure_years > 0.0);
        assert!(request.inputs.tenure_years < 30.0);
    }

    #[test]
    fn api_request_solves_for_interest_rate_with_aliases() {
        let json = r#"{
          "monthlyEMI": 23067.45,
          "solveFor": "interestRate"
        }"#;
        let request = api_request_from_json(json).expect("json should parse");

        assert_eq!(request.solved_field, Some(ApiSolveField::InterestRate));
        assert_approx_tol(request.inputs.interest_rate, 8.5, 0.01);
    }

    #[test]
    fn api_request_rejects_never_amortizing_tenure_solve() {
        // First month's interest on the default loan is 21,250.
        let json = r#"{
          "monthlyEmi": 20000,
          "solveFor": "tenure"
        }"#;
        let err = api_request_from_json(json).expect_err("must reject");
        assert!(err.contains("never be repaid"));
    }

    #[test]
    fn api_request_requires_emi_for_tenure_solve() {
        let json = r#"{ "solveFor": "tenure" }"#;
        let err = api_request_from_json(json).expect_err("must reject");
        assert!(err.contains("monthlyEmi"));
    }

    #[test]
    fn yearly_aggregation_sums_flows_and_keeps_running_totals() {
        let inputs = build_inputs(sample_cli()).expect("valid inputs");
        let output = run_simulation(&inputs).expect("simulable");
        let yearly = aggregate_yearly(&output.amortization_data);

        // 360 full months plus the sweep-up month for the EMI's rounding
        // residual: 30 full years and one partial row.
        assert_eq!(yearly.len(), 31);
        assert_eq!(yearly[0].year, 1);
        assert_eq!(yearly[30].year, 31);

        let first_year_interest: f64 = output.amortization_data[..12]
            .iter()
            .map(|r| r.interest_paid)
            .sum();
        assert_approx(yearly[0].interest_paid, first_year_interest);
        assert_approx(
            yearly[0].total_interest,
            output.amortization_data[11].total_interest,
        );
        assert_approx(
            yearly[30].ending_balance,
            output
                .amortization_data
                .last()
                .expect("rows")
                .ending_balance,
        );
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let inputs = build_inputs(sample_cli()).expect("valid inputs");
        let output = run_simulation(&inputs).expect("simulable");
        let yearly_amortization = aggregate_yearly(&output.amortization_data);
        let response = SimulateResponse {
            inputs: inputs.into(),
            solved_field: Some(ApiSolveField::Emi),
            summary: output.summary,
            chart_data: output.chart_data,
            amortization_data: output.amortization_data,
            yearly_amortization,
        };

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"chartData\""));
        assert!(json.contains("\"amortizationData\""));
        assert!(json.contains("\"yearlyAmortization\""));
        assert!(json.contains("\"baseLoanBalance\""));
        assert!(json.contains("\"sipNominalCorpus\""));
        assert!(json.contains("\"loanFreeMonth\""));
        assert!(json.contains("\"solvedField\":\"emi\""));
    }

    #[test]
    fn optimize_response_serialization_contains_strategies() {
        let inputs = build_inputs(sample_cli()).expect("valid inputs");
        let strategies = generate_optimization_strategies(&inputs, 100_000.0);
        let response = OptimizeResponse {
            inputs: inputs.into(),
            annual_surplus: 100_000.0,
            strategies,
        };

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"annualSurplus\""));
        assert!(json.contains("\"Rapid Prepayment\""));
        assert!(json.contains("\"Balanced Growth\""));
        assert!(json.contains("\"Wealth Maximizer\""));
        assert!(json.contains("\"riskLevel\":\"Conservative\""));
        assert!(json.contains("\"interestSaved\""));
    }

    #[test]
    fn optimize_payload_parses_surplus_and_base_fields() {
        let json = r#"{
          "principal": 4000000,
          "interestRate": 9,
          "tenureYears": 20,
          "monthlySIP": 5000,
          "annualSurplus": 150000
        }"#;
        let payload =
            serde_json::from_str::<OptimizePayload>(json).expect("payload should parse");
        assert_eq!(payload.annual_surplus, Some(150_000.0));

        let request = api_request_from_payload((&payload).into()).expect("valid request");
        assert_approx(request.inputs.principal, 4_000_000.0);
        assert_approx(request.inputs.monthly_sip, 5_000.0);
    }
}
