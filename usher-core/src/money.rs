//! Monetary values are integer cents throughout the engine. Percentage
//! math runs on f64 intermediates and is rounded back to whole cents only
//! at published boundaries, so repeated intermediate rounding cannot
//! drift the final total.

/// Round a fractional cent amount to whole cents, half away from zero.
pub fn round_cents(value: f64) -> i64 {
    if value >= 0.0 {
        (value + 0.5).floor() as i64
    } else {
        (value - 0.5).ceil() as i64
    }
}

/// Exact (unrounded) percentage of an amount in cents.
pub fn percent_of(amount_cents: i64, percent: f64) -> f64 {
    amount_cents as f64 * percent / 100.0
}

/// Format cents as a decimal string, e.g. `1250` -> `"12.50"`.
/// Used when appending order amounts to confirmation URLs.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
