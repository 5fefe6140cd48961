//! Shared time helpers: second rounding, display formatting and the small
//! duration / time-of-day grammars accepted by the CLI.

use chrono::NaiveTime;

use crate::error::ValidationError;

/// Round a millisecond span up to whole seconds.
///
/// Negative spans (a deadline already in the past) clamp to zero, so the
/// caller sees `0` exactly when no time remains.
pub fn ceil_secs(ms: i64) -> u64 {
    if ms <= 0 {
        return 0;
    }
    (ms as u64).div_ceil(1000)
}

/// `H:MM:SS` when at least an hour remains, otherwise `M:SS`.
pub fn format_clock(total_secs: u64) -> String {
    let hrs = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    if hrs > 0 {
        format!("{hrs}:{mins:02}:{secs:02}")
    } else {
        format!("{mins}:{secs:02}")
    }
}

/// Coarse summary used in listings: `1h 30m`, `2h`, `45m`.
pub fn format_duration(total_secs: u64) -> String {
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    match (h, m) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// Parse `90m`, `1h30m`, `2h`, `300s` or a bare number of minutes into seconds.
pub fn parse_duration(text: &str) -> Result<u64, ValidationError> {
    let invalid = |message: &str| ValidationError::InvalidValue {
        field: "duration".into(),
        message: format!("'{text}': {message}"),
    };

    let s = text.trim().to_ascii_lowercase();
    if s.is_empty() {
        return Err(invalid("empty"));
    }
    let too_long = || invalid("too long");
    if let Ok(mins) = s.parse::<u64>() {
        return mins.checked_mul(60).ok_or_else(too_long);
    }

    let mut total = 0u64;
    let mut digits = String::new();
    for ch in s.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let unit = match ch {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            ' ' if digits.is_empty() => continue,
            _ => return Err(invalid("expected a number followed by h, m or s")),
        };
        if digits.is_empty() {
            return Err(invalid("unit without a number"));
        }
        let n: u64 = digits.parse().map_err(|_| too_long())?;
        total = n
            .checked_mul(unit)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(too_long)?;
        digits.clear();
    }
    if !digits.is_empty() {
        return Err(invalid("trailing number without a unit"));
    }
    Ok(total)
}

/// Parse a time of day as `HH:MM` (24h) or `H:MM am` / `H:MMpm`.
pub fn parse_time_of_day(text: &str) -> Result<NaiveTime, ValidationError> {
    let s = text.trim().to_ascii_lowercase();
    let (clock, meridiem) = if let Some(rest) = s.strip_suffix("am") {
        (rest.trim(), Some(false))
    } else if let Some(rest) = s.strip_suffix("pm") {
        (rest.trim(), Some(true))
    } else {
        (s.as_str(), None)
    };

    let time = NaiveTime::parse_from_str(clock, "%H:%M").map_err(|e| {
        ValidationError::InvalidValue {
            field: "time".into(),
            message: format!("'{text}': {e}"),
        }
    })?;

    match meridiem {
        None => Ok(time),
        Some(pm) => {
            use chrono::Timelike;
            let hour12 = time.hour();
            if hour12 == 0 || hour12 > 12 {
                return Err(ValidationError::InvalidValue {
                    field: "time".into(),
                    message: format!("'{text}': hour must be 1-12 with am/pm"),
                });
            }
            let hour24 = (hour12 % 12) + if pm { 12 } else { 0 };
            Ok(time.with_hour(hour24).unwrap_or(time))
        }
    }
}
