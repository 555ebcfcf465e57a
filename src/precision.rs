use crate::error::{GatewayError, Result};

/// Fractional digits shown in human-readable rate strings
pub const RATE_DISPLAY_DIGITS: usize = 6;

/// Render a rate as `1 {base} = {rate} {currency}` with six fractional digits.
///
/// Only the string is rounded; callers keep the full `f64` alongside it.
pub fn format_rate(base: &str, rate: f64, currency: &str) -> String {
    format!(
        "1 {} = {:.*} {}",
        base, RATE_DISPLAY_DIGITS, rate, currency
    )
}

/// Same as [`format_rate`] with an `(as of {date})` suffix.
pub fn format_historical_rate(base: &str, rate: f64, currency: &str, date: &str) -> String {
    format!("{} (as of {})", format_rate(base, rate, currency), date)
}

/// Effective rate of a conversion: `result / amount`.
///
/// A zero amount has no defined rate and is reported rather than turned into
/// an infinite or NaN value.
pub fn conversion_rate(result: f64, amount: f64) -> Result<f64> {
    if amount == 0.0 {
        return Err(GatewayError::DivisionByZero(
            "conversion rate is undefined for a zero amount".to_string(),
        ));
    }

    let rate = result / amount;
    if !rate.is_finite() {
        return Err(GatewayError::InvalidArgument(format!(
            "conversion rate {:e} / {:e} is not finite",
            result, amount
        )));
    }

    Ok(rate)
}
