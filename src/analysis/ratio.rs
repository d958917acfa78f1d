/// Divide, resolving a zero (or negative) denominator to 0 instead of
/// infinity or NaN. Non-finite quotients also resolve to 0.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        let ratio = numerator / denominator;
        if ratio.is_finite() {
            return ratio;
        }
    }
    0.0
}

/// Return on investment in percent; 0 when `cost` is 0.
pub fn roi(revenue: f64, cost: f64) -> f64 {
    safe_ratio(revenue, cost) * 100.0
}
