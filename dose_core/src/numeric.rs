//! Numeric helpers shared by every generator.
//!
//! All dose comparisons go through [`approx_eq`] so that every code path uses
//! the same tolerance.

use crate::{Error, Result};
use chrono::{Duration, NaiveDate};

/// Tolerance for dose sums in the combination search.
pub const COMBO_EPSILON: f64 = 1e-6;

/// Tolerance for the once-weekly whole/half multiple check.
pub const EXACT_EPSILON: f64 = 1e-9;

/// Longest schedule any generator lays out, about a century.
pub const MAX_SCHEDULE_DAYS: u32 = 36_525;

/// `|a - b| < epsilon`
#[inline]
pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// True if `value` is within `epsilon` of zero.
#[inline]
pub fn is_zero(value: f64, epsilon: f64) -> bool {
    approx_eq(value, 0.0, epsilon)
}

/// Parse user text as a number.
///
/// Accepts `,` as the decimal separator. Empty or non-numeric text yields
/// `None` rather than zero, as do infinities and NaN.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Clamp `value` into `[min, max]`.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Round half-up (away from zero) to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    // nudge values like 2.675 * 100 = 267.49999... back over the half
    let rounded = (scaled + scaled.signum() * 1e-9).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Round half-up and format with exactly `decimals` places (`2.5` -> `"2.50"`).
pub fn round_fixed(value: f64, decimals: u32) -> String {
    format!("{:.*}", decimals as usize, round_to(value, decimals))
}

/// Display form of a dose: two places with a trailing `.00` or single
/// trailing zero removed (`5.00` -> `5`, `2.50` -> `2.5`).
pub fn format_dose(value: f64) -> String {
    let mut text = round_fixed(value, 2);
    if text.ends_with(".00") {
        text.truncate(text.len() - 3);
    } else if text.contains('.') && text.ends_with('0') {
        text.pop();
    }
    text
}

/// Integer ceiling division; `denominator` must be non-zero.
#[inline]
pub fn ceil_div(numerator: u32, denominator: u32) -> u32 {
    numerator.div_ceil(denominator)
}

/// Reject schedules longer than [`MAX_SCHEDULE_DAYS`].
pub fn check_schedule_days(days: u64, field: &str) -> Result<u32> {
    u32::try_from(days)
        .ok()
        .filter(|d| *d <= MAX_SCHEDULE_DAYS)
        .ok_or_else(|| {
            Error::invalid(
                field,
                format!("schedule may last at most {} days", MAX_SCHEDULE_DAYS),
            )
        })
}

/// The date `days` after `start`, or an input error naming `field`.
pub fn date_after(start: NaiveDate, days: u32, field: &str) -> Result<NaiveDate> {
    start
        .checked_add_signed(Duration::days(days as i64))
        .ok_or_else(|| Error::invalid(field, "schedule runs past the supported date range"))
}

/// `a * b` as a piece count, or an input error naming `field`.
pub fn count_mul(a: u32, b: u32, field: &str) -> Result<u32> {
    a.checked_mul(b)
        .ok_or_else(|| Error::invalid(field, "too many pieces to count"))
}

/// `a + b` as a piece count, or an input error naming `field`.
pub fn count_add(a: u32, b: u32, field: &str) -> Result<u32> {
    a.checked_add(b)
        .ok_or_else(|| Error::invalid(field, "too many pieces to count"))
}
