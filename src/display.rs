//! Cosmetic formatting for API consumers. Never feeds back into computation.

/// Axis label with two decimals, e.g. `0.25` or `101.40`.
pub fn label(value: f64) -> String {
    format!("{value:.2}")
}

/// Currency string with two decimals, e.g. `$12.34` or `-$0.50`.
pub fn currency(value: f64) -> String {
    let cents = (value * 100.0).round();
    if cents < 0.0 {
        format!("-${:.2}", -cents / 100.0)
    } else {
        // Also folds -0.0 into "$0.00"
        format!("${:.2}", cents.abs() / 100.0)
    }
}
