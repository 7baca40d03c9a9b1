//! Optimal trade entry levels: the retracement price a given fraction into a
//! swing, measured from the end of the move.

pub const DEFAULT_THRESHOLD: f64 = 0.618;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum OteError {
    #[error("swing high {high} must be above swing low {low}")]
    InvalidSwing { low: f64, high: f64 },
    #[error("threshold {0} must lie strictly between 0 and 1")]
    InvalidThreshold(f64),
}

/// Entry level for a long after a move up from `swing_low` to `swing_high`.
///
/// # Errors
/// Fails when the swing is empty or inverted, or the threshold is outside `(0, 1)`.
pub fn bullish(swing_low: f64, swing_high: f64, threshold: f64) -> Result<f64, OteError> {
    let range = validate(swing_low, swing_high, threshold)?;

    Ok(round_cents(swing_high - threshold * range))
}

/// Entry level for a short after a move down from `swing_high` to `swing_low`.
///
/// # Errors
/// Same conditions as [`bullish`].
pub fn bearish(swing_high: f64, swing_low: f64, threshold: f64) -> Result<f64, OteError> {
    let range = validate(swing_low, swing_high, threshold)?;

    Ok(round_cents(swing_low + threshold * range))
}

fn validate(low: f64, high: f64, threshold: f64) -> Result<f64, OteError> {
    // Written so NaN fails both checks.
    if !(high > low) {
        return Err(OteError::InvalidSwing { low, high });
    }
    if !(threshold > 0.0 && threshold < 1.0) {
        return Err(OteError::InvalidThreshold(threshold));
    }

    Ok(high - low)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
