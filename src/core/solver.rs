use super::types::SolveError;

/// Upper bound of the bisection search for an implied interest rate, in
/// annual percent.
const RATE_SEARCH_MAX: f64 = 50.0;
const RATE_SEARCH_ITERATIONS: u32 = 50;

pub(crate) fn monthly_rate(annual_percent: f64) -> f64 {
    annual_percent / 12.0 / 100.0
}

/// Standard amortizing-loan annuity formula:
/// `EMI = P * r * (1+r)^n / ((1+r)^n - 1)` with `r` the monthly rate and `n`
/// the tenure in months. A zero rate degenerates to straight-line `P/n`.
pub fn solve_emi(principal: f64, annual_rate: f64, tenure_years: f64) -> Result<f64, SolveError> {
    if principal <= 0.0 || annual_rate < 0.0 || tenure_years <= 0.0 {
        return Err(SolveError::InvalidInput);
    }

    let months = tenure_years * 12.0;
    let rate = monthly_rate(annual_rate);
    if rate == 0.0 {
        return Ok(principal / months);
    }

    let growth = (1.0 + rate).powf(months);
    Ok(principal * rate * growth / (growth - 1.0))
}

/// Inverse of [`solve_emi`] for the tenure, in years:
/// `n = ln(EMI / (EMI - P*r)) / ln(1 + r)`, divided by 12. An EMI at or below
/// the first month's interest means the balance never falls.
pub fn solve_tenure(principal: f64, annual_rate: f64, emi: f64) -> Result<f64, SolveError> {
    if principal <= 0.0 || annual_rate < 0.0 || emi <= 0.0 {
        return Err(SolveError::InvalidInput);
    }

    let rate = monthly_rate(annual_rate);
    if rate == 0.0 {
        return Ok(principal / emi / 12.0);
    }
    if emi <= principal * rate {
        return Err(SolveError::NeverAmortizes);
    }

    let months = (emi / (emi - principal * rate)).ln() / (1.0 + rate).ln();
    Ok(months / 12.0)
}

/// No closed form exists for the implied rate, so it is recovered by
/// bisection over `[0, RATE_SEARCH_MAX]` percent with [`solve_emi`] as the
/// forward oracle. The EMI is monotonically increasing in the rate, so a
/// candidate whose EMI overshoots the target bounds the true rate from above.
pub fn solve_interest_rate(
    principal: f64,
    tenure_years: f64,
    emi: f64,
) -> Result<f64, SolveError> {
    if principal <= 0.0 || tenure_years <= 0.0 || emi <= 0.0 {
        return Err(SolveError::InvalidInput);
    }
    if emi * tenure_years * 12.0 <= principal {
        return Err(SolveError::TargetUnreachable);
    }

    let rate = bisect(0.0, RATE_SEARCH_MAX, RATE_SEARCH_ITERATIONS, emi, |mid| {
        solve_emi(principal, mid, tenure_years).unwrap_or(f64::INFINITY)
    });
    Ok(rate)
}

/// Pure bisection: shrink `[lo, hi]` around the point where the ascending
/// `oracle` crosses `target`, returning the last midpoint. Stops early once
/// the midpoint can no longer move in floating point.
fn bisect(
    mut lo: f64,
    mut hi: f64,
    iterations: u32,
    target: f64,
    oracle: impl Fn(f64) -> f64,
) -> f64 {
    let mut mid = (lo + hi) / 2.0;
    for _ in 0..iterations {
        mid = (lo + hi) / 2.0;
        if mid == lo || mid == hi {
            break;
        }
        if oracle(mid) > target {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    mid
}
