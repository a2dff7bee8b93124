use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeDelta, Utc};

use crate::error::AppError;

/// Date format accepted from callers, e.g. `01/11/2025`.
pub const DATE_INPUT_FORMAT: &str = "%d/%m/%Y";

/// Format used when rendering publish times.
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M";

const LOCAL_OFFSET_SECS: i32 = 7 * 3600;

/// The fixed UTC+7 offset all caller dates and publish times are expressed in.
pub fn local_offset() -> FixedOffset {
    FixedOffset::east_opt(LOCAL_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Parse a `dd/mm/yyyy` date as the first second of that day in UTC+7.
pub fn parse_start_date(input: &str) -> Result<DateTime<FixedOffset>, AppError> {
    local_midnight(input)
}

/// Parse a `dd/mm/yyyy` date as the last second of that day in UTC+7.
pub fn parse_end_date(input: &str) -> Result<DateTime<FixedOffset>, AppError> {
    let start = local_midnight(input)?;
    Ok(start + TimeDelta::days(1) - TimeDelta::seconds(1))
}

fn local_midnight(input: &str) -> Result<DateTime<FixedOffset>, AppError> {
    let trimmed = input.trim();
    let date = NaiveDate::parse_from_str(trimmed, DATE_INPUT_FORMAT).map_err(|e| {
        AppError::InvalidQuery(format!(
            "Invalid date '{trimmed}': expected dd/mm/yyyy ({e})"
        ))
    })?;

    date.and_time(NaiveTime::MIN)
        .and_local_timezone(local_offset())
        .single()
        .ok_or_else(|| AppError::InvalidQuery(format!("Date '{trimmed}' is out of range")))
}

/// Convert a raw epoch-seconds attribute into a UTC+7 timestamp.
///
/// Returns `None` for anything that is not an integer or falls outside
/// chrono's representable range.
pub fn parse_epoch_seconds(raw: &str) -> Option<DateTime<FixedOffset>> {
    let secs: i64 = raw.trim().parse().ok()?;
    DateTime::from_timestamp(secs, 0).map(|utc| utc.with_timezone(&local_offset()))
}

/// Convert a `yyyyMMdd...` label into midnight of that day in UTC+7.
///
/// Only the first eight characters are read; whatever follows (article ids
/// and the like) is ignored.
pub fn parse_date_label(raw: &str) -> Option<DateTime<FixedOffset>> {
    let prefix = raw.trim().get(..8)?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(prefix, "%Y%m%d")
        .ok()?
        .and_time(NaiveTime::MIN)
        .and_local_timezone(local_offset())
        .single()
}
