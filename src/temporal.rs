//! Temporal validity arithmetic for SAML messages.
//!
//! Converts between protocol timestamps and Unix time, interprets ISO-8601
//! durations with calendar-aware month/year arithmetic, and resolves the
//! earliest of a cache-duration and a valid-until expiry. The expiry result
//! gates assertion freshness checks elsewhere in the toolkit.

use chrono::{DateTime, Days, Duration, Months, NaiveDateTime, Utc};

use crate::error::{Error, Result};

const SAML_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const SAML_TIME_FORMAT_FRACTIONAL: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Current UTC time as a whole-second Unix timestamp.
pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// Formats a Unix timestamp as `yyyy-mm-ddThh:mm:ssZ` (UTC, second precision).
pub fn to_saml_timestamp(timestamp: i64) -> Result<String> {
    let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0)
        .ok_or_else(|| Error::MalformedTimestamp(format!("timestamp {timestamp} out of range")))?;
    Ok(datetime.format(SAML_TIME_FORMAT).to_string())
}

/// Parses a SAML timestamp, with or without a fractional-second component.
///
/// Sub-second digits are accepted on input but discarded; the result is
/// whole seconds.
pub fn from_saml_timestamp(text: &str) -> Result<i64> {
    NaiveDateTime::parse_from_str(text, SAML_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, SAML_TIME_FORMAT_FRACTIONAL))
        .map(|naive| naive.and_utc().timestamp())
        .map_err(|_| Error::MalformedTimestamp(text.to_string()))
}

/// Interprets an ISO-8601 duration relative to a timestamp (default: now).
///
/// Month and year components use calendar arithmetic, not fixed-second
/// approximations, so `P1M` applied to January 31st clamps to the end of
/// February.
pub fn apply_duration(duration: &str, timestamp: Option<i64>) -> Result<i64> {
    let parts = parse_iso_duration(duration)?;
    let base = timestamp.unwrap_or_else(now);
    let start = DateTime::<Utc>::from_timestamp(base, 0)
        .ok_or_else(|| Error::MalformedTimestamp(format!("timestamp {base} out of range")))?;

    // Components come from remote input; saturating or wrapping here would
    // silently move an expiry, so every step is checked.
    let overflow = || Error::MalformedDuration(format!("duration {duration} out of range"));

    let months = parts
        .years
        .checked_mul(12)
        .and_then(|m| m.checked_add(parts.months))
        .and_then(|m| u32::try_from(m).ok())
        .ok_or_else(overflow)?;
    let days = parts
        .weeks
        .checked_mul(7)
        .and_then(|d| d.checked_add(parts.days))
        .and_then(|d| u64::try_from(d).ok())
        .ok_or_else(overflow)?;
    let seconds = parts
        .hours
        .checked_mul(3600)
        .zip(parts.minutes.checked_mul(60))
        .and_then(|(h, m)| h.checked_add(m))
        .and_then(|s| s.checked_add(parts.seconds.trunc() as i64))
        .ok_or_else(overflow)?;

    let shifted = if parts.negative {
        start
            .checked_sub_months(Months::new(months))
            .and_then(|dt| dt.checked_sub_days(Days::new(days)))
            .and_then(|dt| dt.checked_sub_signed(Duration::seconds(seconds)))
    } else {
        start
            .checked_add_months(Months::new(months))
            .and_then(|dt| dt.checked_add_days(Days::new(days)))
            .and_then(|dt| dt.checked_add_signed(Duration::seconds(seconds)))
    };

    Ok(shifted.ok_or_else(overflow)?.timestamp())
}

/// A `validUntil` expiry expression: absolute Unix time or a SAML timestamp.
#[derive(Debug, Clone)]
pub enum ValidUntil<'a> {
    Timestamp(i64),
    Saml(&'a str),
}

/// Resolves the earliest of a cache duration and a valid-until expression.
///
/// Both present: the earlier wins. One present: that one. Neither: no expiry.
pub fn expire_time(
    cache_duration: Option<&str>,
    valid_until: Option<ValidUntil<'_>>,
) -> Result<Option<i64>> {
    let mut expire = match cache_duration {
        Some(duration) => Some(apply_duration(duration, None)?),
        None => None,
    };

    if let Some(valid_until) = valid_until {
        let valid_until_time = match valid_until {
            ValidUntil::Timestamp(timestamp) => timestamp,
            ValidUntil::Saml(text) => from_saml_timestamp(text)?,
        };
        if expire.is_none_or(|current| current > valid_until_time) {
            expire = Some(valid_until_time);
        }
    }

    Ok(expire)
}

#[derive(Debug, Default, PartialEq)]
struct IsoDuration {
    negative: bool,
    years: i64,
    months: i64,
    weeks: i64,
    days: i64,
    hours: i64,
    minutes: i64,
    seconds: f64,
}

/// Parses `[-]PnYnMnWnDTnHnMnS`; a fraction is only accepted on seconds.
fn parse_iso_duration(text: &str) -> Result<IsoDuration> {
    let malformed = || Error::MalformedDuration(text.to_string());

    let mut rest = text.trim();
    let mut duration = IsoDuration::default();

    if let Some(stripped) = rest.strip_prefix('-') {
        duration.negative = true;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }
    rest = rest.strip_prefix('P').ok_or_else(malformed)?;

    let mut in_time = false;
    let mut seen_component = false;
    let mut chars = rest.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c == 'T' {
            if in_time {
                return Err(malformed());
            }
            in_time = true;
            chars.next();
            continue;
        }

        let mut number = String::new();
        while let Some(&d) = chars.peek() {
            if d.is_ascii_digit() || d == '.' {
                number.push(d);
                chars.next();
            } else {
                break;
            }
        }
        let designator = chars.next().ok_or_else(malformed)?;
        if number.is_empty() {
            return Err(malformed());
        }

        let integral = || number.parse::<i64>().map_err(|_| malformed());
        match (in_time, designator) {
            (false, 'Y') => duration.years = integral()?,
            (false, 'M') => duration.months = integral()?,
            (false, 'W') => duration.weeks = integral()?,
            (false, 'D') => duration.days = integral()?,
            (true, 'H') => duration.hours = integral()?,
            (true, 'M') => duration.minutes = integral()?,
            (true, 'S') => {
                duration.seconds = number.parse::<f64>().map_err(|_| malformed())?;
            }
            _ => return Err(malformed()),
        }
        seen_component = true;
    }

    if !seen_component {
        return Err(malformed());
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2014-01-01T00:00:00Z
    const BASE: i64 = 1_388_534_400;

    #[test]
    fn formats_and_parses_whole_seconds() {
        let formatted = to_saml_timestamp(BASE).unwrap();
        assert_eq!(formatted, "2014-01-01T00:00:00Z");
        assert_eq!(from_saml_timestamp(&formatted).unwrap(), BASE);
    }

    #[test]
    fn round_trips_arbitrary_timestamps() {
        for t in [0, 1, 951_782_400, BASE, 4_102_444_799] {
            assert_eq!(from_saml_timestamp(&to_saml_timestamp(t).unwrap()).unwrap(), t);
        }
    }

    #[test]
    fn discards_fractional_seconds() {
        assert_eq!(
            from_saml_timestamp("2014-01-01T00:00:00.123456Z").unwrap(),
            BASE
        );
    }

    #[test]
    fn rejects_malformed_timestamps() {
        for bad in ["", "2014-01-01 00:00:00", "2014-01-01T00:00:00", "not a time"] {
            assert!(matches!(
                from_saml_timestamp(bad),
                Err(Error::MalformedTimestamp(_))
            ));
        }
    }

    #[test]
    fn applies_fixed_durations() {
        assert_eq!(apply_duration("PT1H", Some(BASE)).unwrap(), BASE + 3600);
        assert_eq!(apply_duration("P1D", Some(BASE)).unwrap(), BASE + 86_400);
        assert_eq!(apply_duration("P1W", Some(BASE)).unwrap(), BASE + 7 * 86_400);
        assert_eq!(
            apply_duration("PT1M30S", Some(BASE)).unwrap(),
            BASE + 90
        );
    }

    #[test]
    fn applies_calendar_months() {
        // 2015-01-31T00:00:00Z + P1M clamps to 2015-02-28T00:00:00Z
        let jan_31 = 1_422_662_400;
        let feb_28 = 1_425_081_600;
        assert_eq!(apply_duration("P1M", Some(jan_31)).unwrap(), feb_28);

        // one calendar year across a leap boundary
        let y2020 = 1_577_836_800; // 2020-01-01T00:00:00Z
        let y2021 = 1_609_459_200; // 2021-01-01T00:00:00Z
        assert_eq!(apply_duration("P1Y", Some(y2020)).unwrap(), y2021);
    }

    #[test]
    fn applies_negative_durations() {
        assert_eq!(apply_duration("-PT1H", Some(BASE)).unwrap(), BASE - 3600);
    }

    #[test]
    fn truncates_fractional_duration_seconds() {
        assert_eq!(apply_duration("PT1.9S", Some(BASE)).unwrap(), BASE + 1);
    }

    #[test]
    fn rejects_overflowing_durations() {
        for huge in [
            "PT9223372036854775807H",
            "P9223372036854775807Y",
            "P99999999999W99999999999D",
            "PT9223372036854775807M1S",
        ] {
            assert!(matches!(
                apply_duration(huge, Some(BASE)),
                Err(Error::MalformedDuration(_))
            ));
        }
    }

    #[test]
    fn rejects_malformed_durations() {
        for bad in ["", "P", "1H", "PT", "P1H", "PTxS", "P1.5Y"] {
            assert!(matches!(
                apply_duration(bad, Some(BASE)),
                Err(Error::MalformedDuration(_))
            ));
        }
    }

    #[test]
    fn expire_time_prefers_earlier() {
        let soon = now() + 60;
        let late = now() + 7200;

        // valid-until earlier than cache duration
        let expiry = expire_time(Some("PT1H"), Some(ValidUntil::Timestamp(soon)))
            .unwrap()
            .unwrap();
        assert_eq!(expiry, soon);

        // cache duration earlier than valid-until
        let expiry = expire_time(Some("PT1H"), Some(ValidUntil::Timestamp(late)))
            .unwrap()
            .unwrap();
        assert!(expiry < late && expiry >= now() + 3590);
    }

    #[test]
    fn expire_time_single_inputs() {
        let until = "2030-01-01T00:00:00Z";
        assert_eq!(
            expire_time(None, Some(ValidUntil::Saml(until))).unwrap(),
            Some(from_saml_timestamp(until).unwrap())
        );
        assert!(expire_time(Some("PT1H"), None).unwrap().is_some());
        assert_eq!(expire_time(None, None).unwrap(), None);
    }
}
