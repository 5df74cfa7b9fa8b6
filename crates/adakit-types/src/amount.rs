//! Lovelace amount helpers.
//!
//! Amounts are always integers in lovelace. Conversions to and from the
//! display unit go through decimal text so no precision is ever lost.

use crate::TypesError;

/// Lovelace per ADA (10^6).
pub const LOVELACE_PER_ADA: u64 = 1_000_000;

/// Number of decimal places for display.
pub const DISPLAY_DECIMAL_POINT: usize = 6;

/// Convert a whole number of ADA to lovelace.
pub fn to_lovelace(ada: u64) -> Option<u64> {
    ada.checked_mul(LOVELACE_PER_ADA)
}

/// Format a lovelace amount as ADA (e.g. `1.5`, `0.000001`).
pub fn to_ada(lovelace: u64) -> String {
    let whole = lovelace / LOVELACE_PER_ADA;
    let frac = lovelace % LOVELACE_PER_ADA;
    if frac == 0 {
        format!("{}.0", whole)
    } else {
        let frac_str = format!("{:06}", frac);
        format!("{}.{}", whole, frac_str.trim_end_matches('0'))
    }
}

/// Parse an ADA amount string (`"12"`, `"0.5"`, `"1.000001"`) to lovelace.
pub fn parse_ada(s: &str) -> Result<u64, TypesError> {
    let invalid = || TypesError::InvalidAmount(s.to_string());
    let s = s.trim();
    let (whole_str, frac_str) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole_str.is_empty() && frac_str.is_empty() {
        return Err(invalid());
    }
    if !whole_str.chars().all(|c| c.is_ascii_digit())
        || !frac_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    let whole: u64 = if whole_str.is_empty() {
        0
    } else {
        whole_str.parse().map_err(|_| invalid())?
    };
    let frac: u64 = if frac_str.is_empty() {
        0
    } else {
        if frac_str.len() > DISPLAY_DECIMAL_POINT {
            return Err(invalid());
        }
        let padded = format!("{:0<6}", frac_str);
        padded.parse().map_err(|_| invalid())?
    };

    whole
        .checked_mul(LOVELACE_PER_ADA)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(invalid)
}

/// Parse a plain lovelace integer.
pub fn parse_lovelace(s: &str) -> Result<u64, TypesError> {
    s.trim()
        .parse()
        .map_err(|_| TypesError::InvalidAmount(s.to_string()))
}
