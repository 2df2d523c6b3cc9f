//! Calendar and duration values.
//!
//! Literals follow the XML Schema lexical forms. A trailing timezone is
//! either `Z` or `±hh:mm`.

use std::cmp::Ordering;
use std::fmt;

use chrono::{
    DateTime, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, Utc,
};

const SECONDS_PER_DAY: i64 = 86_400;
const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ============================================================================
// Timezones
// ============================================================================

/// Splits an optional trailing timezone off a lexical date/time.
pub(crate) fn split_timezone(literal: &str) -> Result<(&str, Option<FixedOffset>), String> {
    if let Some(body) = literal.strip_suffix('Z') {
        return Ok((body, Some(Utc.fix())));
    }

    let bytes = literal.as_bytes();
    let n = bytes.len();
    if n >= 6 && matches!(bytes[n - 6], b'+' | b'-') && bytes[n - 3] == b':' {
        let hours: i32 = literal[n - 5..n - 3]
            .parse()
            .map_err(|_| "invalid timezone hours".to_string())?;
        let minutes: i32 = literal[n - 2..]
            .parse()
            .map_err(|_| "invalid timezone minutes".to_string())?;
        if hours > 14 || minutes > 59 {
            return Err("timezone out of range".to_string());
        }
        let sign = if bytes[n - 6] == b'-' { -1 } else { 1 };
        let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .ok_or_else(|| "timezone out of range".to_string())?;
        return Ok((&literal[..n - 6], Some(offset)));
    }

    Ok((literal, None))
}

pub(crate) fn format_timezone(offset: FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    if seconds == 0 {
        return "Z".to_string();
    }
    let sign = if seconds < 0 { '-' } else { '+' };
    let seconds = seconds.abs();
    format!("{sign}{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60)
}

// ============================================================================
// Date
// ============================================================================

/// An `xs:date`: a calendar date with an optional timezone.
///
/// Dates compare on the calendar date alone.
#[derive(Debug, Clone, Copy)]
pub struct XsDate {
    pub date: NaiveDate,
    pub offset: Option<FixedOffset>,
}

impl XsDate {
    pub fn new(date: NaiveDate) -> Self {
        Self { date, offset: None }
    }

    pub(crate) fn parse(literal: &str) -> Result<Self, String> {
        let (body, offset) = split_timezone(literal)?;
        let date = NaiveDate::parse_from_str(body, "%Y-%m-%d").map_err(|e| e.to_string())?;
        Ok(Self { date, offset })
    }

    /// Adds a (possibly negative) number of months, clamping the day of month.
    pub fn add_months(self, months: i64) -> Option<Self> {
        let date = shift_months(self.date, months)?;
        Some(Self { date, ..self })
    }
}

impl PartialEq for XsDate {
    fn eq(&self, other: &Self) -> bool {
        self.date == other.date
    }
}

impl PartialOrd for XsDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.date.cmp(&other.date))
    }
}

impl fmt::Display for XsDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date.format("%Y-%m-%d"))?;
        if let Some(offset) = self.offset {
            f.write_str(&format_timezone(offset))?;
        }
        Ok(())
    }
}

// ============================================================================
// Time
// ============================================================================

/// An `xs:time`: a time of day with an optional timezone.
///
/// Times carrying a timezone are normalised to UTC before comparison.
#[derive(Debug, Clone, Copy)]
pub struct XsTime {
    pub time: NaiveTime,
    pub offset: Option<FixedOffset>,
}

impl XsTime {
    pub fn new(time: NaiveTime) -> Self {
        Self { time, offset: None }
    }

    pub(crate) fn parse(literal: &str) -> Result<Self, String> {
        let (body, offset) = split_timezone(literal)?;
        let time = NaiveTime::parse_from_str(body, "%H:%M:%S%.f").map_err(|e| e.to_string())?;
        Ok(Self { time, offset })
    }

    fn normalized(&self) -> NaiveTime {
        match self.offset {
            Some(offset) => {
                let shift = TimeDelta::seconds(i64::from(offset.local_minus_utc()));
                self.time.overflowing_sub_signed(shift).0
            }
            None => self.time,
        }
    }
}

impl PartialEq for XsTime {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl PartialOrd for XsTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.normalized().cmp(&other.normalized()))
    }
}

impl fmt::Display for XsTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.time.format("%H:%M:%S%.f"))?;
        if let Some(offset) = self.offset {
            f.write_str(&format_timezone(offset))?;
        }
        Ok(())
    }
}

// ============================================================================
// DateTime
// ============================================================================

/// Parses an `xs:dateTime`. A literal without a timezone is taken as UTC.
pub(crate) fn parse_date_time(literal: &str) -> Result<DateTime<FixedOffset>, String> {
    let (body, offset) = split_timezone(literal)?;
    let naive = NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| e.to_string())?;
    naive
        .and_local_timezone(offset.unwrap_or_else(|| Utc.fix()))
        .single()
        .ok_or_else(|| "ambiguous local time".to_string())
}

pub(crate) fn format_date_time(value: &DateTime<FixedOffset>) -> String {
    format!(
        "{}{}",
        value.format("%Y-%m-%dT%H:%M:%S%.f"),
        format_timezone(*value.offset())
    )
}

/// Adds a (possibly negative) number of months to a dateTime, clamping the
/// day of month.
pub fn add_months_to_date_time(
    value: DateTime<FixedOffset>,
    months: i64,
) -> Option<DateTime<FixedOffset>> {
    let local = value.naive_local();
    let date = shift_months(local.date(), months)?;
    date.and_time(local.time())
        .and_local_timezone(*value.offset())
        .single()
}

fn shift_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        date.checked_add_months(magnitude)
    } else {
        date.checked_sub_months(magnitude)
    }
}

// ============================================================================
// dayTimeDuration
// ============================================================================

/// An `xs:dayTimeDuration`, stored as a signed `TimeDelta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayTimeDuration(pub TimeDelta);

impl DayTimeDuration {
    pub(crate) fn parse(literal: &str) -> Result<Self, String> {
        let (negative, body) = match literal.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, literal),
        };
        let body = body
            .strip_prefix('P')
            .ok_or_else(|| "duration must start with 'P'".to_string())?;

        let (day_part, time_part) = match body.split_once('T') {
            Some((day, time)) => {
                if time.is_empty() {
                    return Err("'T' must be followed by a time component".to_string());
                }
                (day, Some(time))
            }
            None => (body, None),
        };

        let mut components = 0;
        let mut seconds: i64 = 0;
        let mut nanos: i64 = 0;

        if !day_part.is_empty() {
            let days = day_part
                .strip_suffix('D')
                .ok_or_else(|| "expected a day component".to_string())?;
            seconds = parse_component(days)?
                .checked_mul(SECONDS_PER_DAY)
                .ok_or_else(|| "duration out of range".to_string())?;
            components += 1;
        }

        if let Some(mut rest) = time_part {
            for (designator, scale) in [('H', 3600), ('M', 60)] {
                if let Some((value, tail)) = rest.split_once(designator) {
                    let amount = parse_component(value)?
                        .checked_mul(scale)
                        .ok_or_else(|| "duration out of range".to_string())?;
                    seconds = seconds
                        .checked_add(amount)
                        .ok_or_else(|| "duration out of range".to_string())?;
                    components += 1;
                    rest = tail;
                }
            }
            if !rest.is_empty() {
                let value = rest
                    .strip_suffix('S')
                    .ok_or_else(|| format!("unexpected trailing text '{rest}'"))?;
                let (whole, fraction) = match value.split_once('.') {
                    Some((whole, fraction)) => (whole, Some(fraction)),
                    None => (value, None),
                };
                seconds = seconds
                    .checked_add(parse_component(whole)?)
                    .ok_or_else(|| "duration out of range".to_string())?;
                if let Some(fraction) = fraction {
                    nanos = parse_fraction(fraction)?;
                }
                components += 1;
            }
        }

        if components == 0 {
            return Err("duration has no components".to_string());
        }

        let total = TimeDelta::new(seconds, nanos as u32)
            .ok_or_else(|| "duration out of range".to_string())?;
        Ok(Self(if negative { -total } else { total }))
    }

    pub fn is_negative(&self) -> bool {
        self.0 < TimeDelta::zero()
    }
}

impl fmt::Display for DayTimeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = if self.is_negative() { -self.0 } else { self.0 };
        if self.is_negative() {
            f.write_str("-")?;
        }
        f.write_str("P")?;

        let total = magnitude.num_seconds();
        let nanos = i64::from(magnitude.subsec_nanos());
        let days = total / SECONDS_PER_DAY;
        let hours = (total % SECONDS_PER_DAY) / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;

        if days > 0 {
            write!(f, "{days}D")?;
        }
        if hours == 0 && minutes == 0 && seconds == 0 && nanos == 0 {
            if days == 0 {
                f.write_str("T0S")?;
            }
            return Ok(());
        }
        f.write_str("T")?;
        if hours > 0 {
            write!(f, "{hours}H")?;
        }
        if minutes > 0 {
            write!(f, "{minutes}M")?;
        }
        if seconds > 0 || nanos > 0 {
            write!(f, "{seconds}")?;
            if nanos > 0 {
                let fraction = format!("{nanos:09}");
                write!(f, ".{}", fraction.trim_end_matches('0'))?;
            }
            f.write_str("S")?;
        }
        Ok(())
    }
}

// ============================================================================
// yearMonthDuration
// ============================================================================

/// An `xs:yearMonthDuration`, stored as a signed number of months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonthDuration {
    pub months: i64,
}

impl YearMonthDuration {
    pub(crate) fn parse(literal: &str) -> Result<Self, String> {
        let (negative, body) = match literal.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, literal),
        };
        let mut rest = body
            .strip_prefix('P')
            .ok_or_else(|| "duration must start with 'P'".to_string())?;

        let mut components = 0;
        let mut months: i64 = 0;
        if let Some((years, tail)) = rest.split_once('Y') {
            months = parse_component(years)?
                .checked_mul(12)
                .ok_or_else(|| "duration out of range".to_string())?;
            components += 1;
            rest = tail;
        }
        if !rest.is_empty() {
            let value = rest
                .strip_suffix('M')
                .ok_or_else(|| format!("unexpected trailing text '{rest}'"))?;
            months = months
                .checked_add(parse_component(value)?)
                .ok_or_else(|| "duration out of range".to_string())?;
            components += 1;
        }
        if components == 0 {
            return Err("duration has no components".to_string());
        }

        Ok(Self {
            months: if negative { -months } else { months },
        })
    }
}

impl fmt::Display for YearMonthDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.months < 0 {
            f.write_str("-")?;
        }
        let magnitude = self.months.unsigned_abs();
        let (years, months) = (magnitude / 12, magnitude % 12);
        f.write_str("P")?;
        if years > 0 {
            write!(f, "{years}Y")?;
        }
        if months > 0 || years == 0 {
            write!(f, "{months}M")?;
        }
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_component(digits: &str) -> Result<i64, String> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid duration component '{digits}'"));
    }
    digits
        .parse()
        .map_err(|_| format!("duration component '{digits}' out of range"))
}

fn parse_fraction(digits: &str) -> Result<i64, String> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid fractional seconds '{digits}'"));
    }
    // Precision below one nanosecond is truncated.
    let mut nanos: i64 = 0;
    for (i, digit) in digits.bytes().take(9).enumerate() {
        nanos += i64::from(digit - b'0') * NANOS_PER_SECOND / 10_i64.pow(i as u32 + 1);
    }
    Ok(nanos)
}

// ============================================================================
// Tests
// ============================================================================
