// SPDX-License-Identifier: MIT

//! `stop-after` deadline resolution

use crate::error::ConfigError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

const STOP_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Resolve a deadline to an absolute UTC timestamp.
///
/// Accepts relative offsets (`+7d`, `+25h`, `+1d12h`) measured from `now`,
/// dates (`2026-03-01`), date-times (`2026-03-01 12:00:00`) and RFC 3339.
pub fn resolve_stop_time(value: &str, now: DateTime<Utc>) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    let invalid = || ConfigError::InvalidStopTime(value.to_string());

    let deadline = if let Some(offset) = trimmed.strip_prefix('+') {
        let delta = parse_relative(offset).ok_or_else(invalid)?;
        now.checked_add_signed(delta).ok_or_else(invalid)?
    } else if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        parsed.with_timezone(&Utc)
    } else if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, STOP_TIME_FORMAT) {
        parsed.and_utc()
    } else if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?.and_utc()
    } else {
        return Err(invalid());
    };

    Ok(deadline.format(STOP_TIME_FORMAT).to_string())
}

/// `7d`, `25h`, `1d12h`
fn parse_relative(offset: &str) -> Option<Duration> {
    let mut total = Duration::zero();
    let mut digits = String::new();
    let mut components = 0;

    for c in offset.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let amount: i64 = digits.parse().ok()?;
        digits.clear();
        let component = match c {
            'd' => Duration::try_days(amount)?,
            'h' => Duration::try_hours(amount)?,
            _ => return None,
        };
        total = total.checked_add(&component)?;
        components += 1;
    }

    (digits.is_empty() && components > 0).then_some(total)
}
