//! Relative day offsets to calendar dates.
//!
//! The registry export records event dates as day offsets from a trial index
//! date. Every component that turns an offset into a date goes through this
//! module so that equal offsets always produce equal dates.

use chrono::{NaiveDate, TimeDelta};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("invalid relative day offset: {0:?}")]
    InvalidOffset(String),
}

/// Spellings producers use for an absent value.
const MISSING_MARKERS: [&str; 7] = ["nan", "none", "nat", "<na>", "null", "na", "n/a"];

/// Returns true for empty text or a missing-value marker such as `NaN`.
pub fn is_missing_marker(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty()
        || MISSING_MARKERS
            .iter()
            .any(|marker| trimmed.eq_ignore_ascii_case(marker))
}

/// `index_date + offset` days, or `None` when outside the calendar range.
pub fn relative_day_to_date(offset: i64, index_date: NaiveDate) -> Option<NaiveDate> {
    let delta = TimeDelta::try_days(offset)?;
    index_date.checked_add_signed(delta)
}

/// Parses an integer offset, accepting the `5.0` form float columns produce.
fn parse_offset(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(value);
    }
    let value = trimmed.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e12 {
        Some(value as i64)
    } else {
        None
    }
}

/// Resolves an optional raw offset against `index_date`.
///
/// Missing input yields `Ok(None)`; text that is not an integer offset is an
/// [`DateError::InvalidOffset`] for the caller to log and skip.
pub fn resolve_relative_day(
    raw: Option<&str>,
    index_date: NaiveDate,
) -> Result<Option<NaiveDate>, DateError> {
    let Some(raw) = raw.filter(|value| !is_missing_marker(value)) else {
        return Ok(None);
    };
    let offset = parse_offset(raw).ok_or_else(|| DateError::InvalidOffset(raw.to_string()))?;
    relative_day_to_date(offset, index_date)
        .map(Some)
        .ok_or_else(|| DateError::InvalidOffset(raw.to_string()))
}
