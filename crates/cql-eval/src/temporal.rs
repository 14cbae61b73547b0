//! Date/Time/DateTime literal parsing, precision-aware comparison, and
//! calendar arithmetic (spec.md §4.7).

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike};
use cql_ast::TemporalPrecision as Precision;

use crate::error::{EvalError, EvalResult};
use crate::value::Value;

/// `@YYYY`, `@YYYY-MM`, or `@YYYY-MM-DD`, each anchored to midnight for
/// arithmetic purposes. Missing components are filled with their minimum
/// (month 1, day 1) and are never compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CqlDate {
    pub date: NaiveDate,
    pub precision: Precision,
}

/// `@YYYY-MM-DDThh:mm:ss.fff(Z|±hh:mm)`, truncated to any coarser
/// precision the literal specified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CqlDateTime {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub offset: FixedOffset,
    pub precision: Precision,
}

/// `@Thh:mm:ss.fff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CqlTime {
    pub time: NaiveTime,
    pub precision: Precision,
}

/// The four-valued result of a precision-aware comparison (spec.md
/// §4.6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecisionComparison {
    LeftBeforeRight,
    LeftEqualRight,
    LeftAfterRight,
    InsufficientPrecision,
}

impl PrecisionComparison {
    pub fn to_equal_value(self) -> Value {
        match self {
            PrecisionComparison::LeftEqualRight => Value::boolean(true),
            PrecisionComparison::LeftBeforeRight | PrecisionComparison::LeftAfterRight => Value::boolean(false),
            PrecisionComparison::InsufficientPrecision => Value::null(),
        }
    }

    pub fn to_before_value(self) -> Value {
        match self {
            PrecisionComparison::LeftBeforeRight => Value::boolean(true),
            PrecisionComparison::LeftEqualRight | PrecisionComparison::LeftAfterRight => Value::boolean(false),
            PrecisionComparison::InsufficientPrecision => Value::null(),
        }
    }

    pub fn to_after_value(self) -> Value {
        match self {
            PrecisionComparison::LeftAfterRight => Value::boolean(true),
            PrecisionComparison::LeftEqualRight | PrecisionComparison::LeftBeforeRight => Value::boolean(false),
            PrecisionComparison::InsufficientPrecision => Value::null(),
        }
    }
}

/// The ordinal an individual precision component occupies; lower ranks
/// are coarser.
fn rank(p: Precision) -> u8 {
    match p {
        Precision::Year => 0,
        Precision::Month => 1,
        Precision::Week => 2,
        Precision::Day => 3,
        Precision::Hour => 4,
        Precision::Minute => 5,
        Precision::Second => 6,
        Precision::Millisecond => 7,
    }
}

fn component_at(date: NaiveDate, p: Precision) -> i64 {
    match p {
        Precision::Year => date.year() as i64,
        Precision::Month => date.month() as i64,
        Precision::Day => date.day() as i64,
        _ => unreachable!("date components stop at day precision"),
    }
}

fn time_component_at(time: NaiveTime, p: Precision) -> i64 {
    match p {
        Precision::Hour => time.hour() as i64,
        Precision::Minute => time.minute() as i64,
        Precision::Second => time.second() as i64,
        Precision::Millisecond => (time.nanosecond() / 1_000_000) as i64,
        _ => unreachable!("time components start at hour precision"),
    }
}

impl CqlDate {
    pub fn parse(text: &str) -> EvalResult<Self> {
        let bad = || EvalError::AstMalformed(format!("invalid Date literal '{text}', expected @YYYY-MM-DD"));
        let stripped = text.strip_prefix('@').unwrap_or(text);
        let parts: Vec<&str> = stripped.split('-').collect();
        let year: i32 = parts.first().ok_or_else(bad)?.parse().map_err(|_| bad())?;
        let (month, precision) = match parts.get(1) {
            Some(m) => (m.parse().map_err(|_| bad())?, Precision::Month),
            None => (1, Precision::Year),
        };
        let (day, precision) = match parts.get(2) {
            Some(d) => (d.parse().map_err(|_| bad())?, Precision::Day),
            None => (1, precision),
        };
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(bad)?;
        Ok(Self { date, precision })
    }

    pub fn compare_at_precision(&self, other: &Self, precision: Precision) -> PrecisionComparison {
        for p in [Precision::Year, Precision::Month, Precision::Day] {
            if rank(p) > rank(precision) {
                break;
            }
            if rank(p) > rank(self.precision) || rank(p) > rank(other.precision) {
                return PrecisionComparison::InsufficientPrecision;
            }
            let (a, b) = (component_at(self.date, p), component_at(other.date, p));
            if a < b {
                return PrecisionComparison::LeftBeforeRight;
            }
            if a > b {
                return PrecisionComparison::LeftAfterRight;
            }
        }
        PrecisionComparison::LeftEqualRight
    }

    /// Adds whole units, silently truncating any unit finer than the
    /// date's own precision (spec.md §4.6.3).
    pub fn add_quantity(&self, quantity_value: i64, unit: &str) -> EvalResult<Self> {
        let finest_allowed = Precision::Day;
        let unit_precision = unit_to_precision(unit)?;
        if rank(unit_precision) > rank(finest_allowed.min(self.precision)) {
            return Ok(*self);
        }
        let date = add_calendar_unit(self.date, quantity_value, unit)?;
        Ok(Self { date, precision: self.precision })
    }

    pub fn min_value() -> Self {
        Self { date: NaiveDate::from_ymd_opt(1, 1, 1).unwrap(), precision: Precision::Day }
    }

    pub fn max_value() -> Self {
        Self { date: NaiveDate::from_ymd_opt(9999, 12, 31).unwrap(), precision: Precision::Day }
    }
}

impl CqlDateTime {
    pub fn parse(text: &str) -> EvalResult<Self> {
        let bad = || EvalError::AstMalformed(format!(
            "invalid DateTime literal '{text}', expected @YYYY-MM-DDThh:mm:ss.fff(Z|+-hh:mm)"
        ));
        let (date_part, rest) = text.split_once('T').ok_or_else(bad)?;
        let cql_date = CqlDate::parse(date_part)?;

        let (time_and_offset, offset, has_offset) = split_offset(rest);
        let (time, time_precision) = parse_time(time_and_offset).ok_or_else(bad)?;
        let offset = offset.unwrap_or(FixedOffset::east_opt(0).unwrap());
        let _ = has_offset;

        Ok(Self { date: cql_date.date, time, offset, precision: time_precision })
    }

    pub fn compare_at_precision(&self, other: &Self, precision: Precision) -> PrecisionComparison {
        let self_utc = self.to_utc_naive();
        let other_utc = other.to_utc_naive();
        for p in [
            Precision::Year,
            Precision::Month,
            Precision::Day,
            Precision::Hour,
            Precision::Minute,
            Precision::Second,
            Precision::Millisecond,
        ] {
            if rank(p) > rank(precision) {
                break;
            }
            if rank(p) > rank(self.precision) || rank(p) > rank(other.precision) {
                return PrecisionComparison::InsufficientPrecision;
            }
            let (a, b) = if rank(p) <= rank(Precision::Day) {
                (component_at(self_utc.0, p), component_at(other_utc.0, p))
            } else {
                (time_component_at(self_utc.1, p), time_component_at(other_utc.1, p))
            };
            if a < b {
                return PrecisionComparison::LeftBeforeRight;
            }
            if a > b {
                return PrecisionComparison::LeftAfterRight;
            }
        }
        PrecisionComparison::LeftEqualRight
    }

    fn to_utc_naive(&self) -> (NaiveDate, NaiveTime) {
        let local = self.date.and_time(self.time);
        let instant = self.offset.from_local_datetime(&local).single().unwrap_or_else(|| {
            self.offset.from_utc_datetime(&local)
        });
        let utc = instant.naive_utc();
        (utc.date(), utc.time())
    }

    pub fn add_quantity(&self, quantity_value: i64, unit: &str) -> EvalResult<Self> {
        let unit_precision = unit_to_precision(unit)?;
        if rank(unit_precision) > rank(self.precision) {
            return Ok(*self);
        }
        if matches!(unit_precision, Precision::Year | Precision::Month | Precision::Week | Precision::Day) {
            let date = add_calendar_unit(self.date, quantity_value, unit)?;
            return Ok(Self { date, ..*self });
        }
        let total_ms: i64 = match unit_precision {
            Precision::Hour => quantity_value * 3_600_000,
            Precision::Minute => quantity_value * 60_000,
            Precision::Second => quantity_value * 1_000,
            Precision::Millisecond => quantity_value,
            _ => unreachable!(),
        };
        let naive = self.date.and_time(self.time) + chrono::Duration::milliseconds(total_ms);
        Ok(Self { date: naive.date(), time: naive.time(), offset: self.offset, precision: self.precision })
    }

    /// Per spec.md §9's resolved open question: bounds are expressed in
    /// the evaluation timestamp's own zone offset, not forced to UTC.
    pub fn max_value(offset: FixedOffset) -> Self {
        Self {
            date: NaiveDate::from_ymd_opt(9999, 12, 31).unwrap(),
            time: NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap(),
            offset,
            precision: Precision::Millisecond,
        }
    }

    pub fn min_value(offset: FixedOffset) -> Self {
        Self {
            date: NaiveDate::from_ymd_opt(1, 1, 1).unwrap(),
            time: NaiveTime::from_hms_milli_opt(0, 0, 0, 0).unwrap(),
            offset,
            precision: Precision::Millisecond,
        }
    }
}

impl CqlTime {
    pub fn parse(text: &str) -> EvalResult<Self> {
        let bad = || EvalError::AstMalformed(format!("invalid Time literal '{text}', expected @Thh:mm:ss.fff"));
        let stripped = text.strip_prefix('@').unwrap_or(text);
        let stripped = stripped.strip_prefix('T').unwrap_or(stripped);
        let (time, precision) = parse_time(stripped).ok_or_else(bad)?;
        Ok(Self { time, precision })
    }

    pub fn compare_at_precision(&self, other: &Self, precision: Precision) -> PrecisionComparison {
        for p in [Precision::Hour, Precision::Minute, Precision::Second, Precision::Millisecond] {
            if rank(p) > rank(precision) {
                break;
            }
            if rank(p) > rank(self.precision) || rank(p) > rank(other.precision) {
                return PrecisionComparison::InsufficientPrecision;
            }
            let (a, b) = (time_component_at(self.time, p), time_component_at(other.time, p));
            if a < b {
                return PrecisionComparison::LeftBeforeRight;
            }
            if a > b {
                return PrecisionComparison::LeftAfterRight;
            }
        }
        PrecisionComparison::LeftEqualRight
    }

    pub fn min_value() -> Self {
        Self { time: NaiveTime::from_hms_milli_opt(0, 0, 0, 0).unwrap(), precision: Precision::Millisecond }
    }

    pub fn max_value() -> Self {
        Self { time: NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap(), precision: Precision::Millisecond }
    }
}

fn unit_to_precision(unit: &str) -> EvalResult<Precision> {
    match unit {
        "year" | "years" => Ok(Precision::Year),
        "month" | "months" => Ok(Precision::Month),
        "week" | "weeks" => Ok(Precision::Week),
        "day" | "days" => Ok(Precision::Day),
        "hour" | "hours" => Ok(Precision::Hour),
        "minute" | "minutes" => Ok(Precision::Minute),
        "second" | "seconds" => Ok(Precision::Second),
        "millisecond" | "milliseconds" => Ok(Precision::Millisecond),
        other => Err(EvalError::UnsupportedUnitConversion(format!("unsupported temporal unit '{other}'"))),
    }
}

fn add_calendar_unit(date: NaiveDate, amount: i64, unit: &str) -> EvalResult<NaiveDate> {
    match unit_to_precision(unit)? {
        Precision::Year => {
            let target_year = date.year() + amount as i32;
            Ok(clamp_day_for_month(target_year, date.month(), date.day()))
        }
        Precision::Month => {
            let total_months = (date.year() as i64) * 12 + (date.month() as i64 - 1) + amount;
            let target_year = (total_months.div_euclid(12)) as i32;
            let target_month = (total_months.rem_euclid(12)) as u32 + 1;
            Ok(clamp_day_for_month(target_year, target_month, date.day()))
        }
        Precision::Week => Ok(date + chrono::Duration::days(amount * 7)),
        Precision::Day => Ok(date + chrono::Duration::days(amount)),
        _ => unreachable!("calendar units stop at day precision"),
    }
}

/// Normalizes an out-of-range day for a target month (e.g. Feb 29 + 1
/// year → Feb 28 of a non-leap year) the way `chrono`'s calendar already
/// does it: walk the day back until the date is valid.
fn clamp_day_for_month(year: i32, month: u32, day: u32) -> NaiveDate {
    let mut d = day;
    loop {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, d) {
            return date;
        }
        d -= 1;
    }
}

fn split_offset(rest: &str) -> (&str, Option<FixedOffset>, bool) {
    if let Some(stripped) = rest.strip_suffix('Z') {
        return (stripped, Some(FixedOffset::east_opt(0).unwrap()), true);
    }
    if let Some(pos) = rest.rfind(['+', '-']) {
        if pos > 0 {
            let (time_part, offset_part) = rest.split_at(pos);
            if let Some(offset) = parse_offset(offset_part) {
                return (time_part, Some(offset), true);
            }
        }
    }
    (rest, None, false)
}

fn parse_offset(text: &str) -> Option<FixedOffset> {
    let sign = if text.starts_with('-') { -1 } else { 1 };
    let digits = &text[1..];
    let (h, m) = digits.split_once(':')?;
    let hours: i32 = h.parse().ok()?;
    let minutes: i32 = m.parse().ok()?;
    let total_seconds = sign * (hours * 3600 + minutes * 60);
    FixedOffset::east_opt(total_seconds)
}

fn parse_time(text: &str) -> Option<(NaiveTime, Precision)> {
    if text.is_empty() {
        return Some((NaiveTime::from_hms_opt(0, 0, 0)?, Precision::Hour));
    }
    let (main, millis) = match text.split_once('.') {
        Some((m, f)) => (m, Some(f)),
        None => (text, None),
    };
    let parts: Vec<&str> = main.split(':').collect();
    let hour: u32 = parts.first()?.parse().ok()?;
    let (minute, precision) = match parts.get(1) {
        Some(m) => (m.parse().ok()?, Precision::Minute),
        None => (0, Precision::Hour),
    };
    let (second, precision) = match parts.get(2) {
        Some(s) => (s.parse().ok()?, Precision::Second),
        None => (0, precision),
    };
    let (milli, precision) = match millis {
        Some(f) => {
            let padded = format!("{f:0<3}");
            (padded[..3].parse().ok()?, Precision::Millisecond)
        }
        None => (0, precision),
    };
    Some((NaiveTime::from_hms_milli_opt(hour, minute, second, milli)?, precision))
}

/// Trailing-zero-trimmed digit count used for `Precision` fallback when
/// a decimal has no literal provenance (spec.md §4.6.2, §9's open
/// question).
pub fn decimal_precision_from_text(text: &str) -> u32 {
    match text.split_once('.') {
        Some((_, frac)) => frac.len() as u32,
        None => 0,
    }
}

/// The digit count `Precision()` reports for a Date/DateTime/Time value
/// at this precision (spec.md §8: 4 for Year, 6 Month, 8 Day, 10 Hour,
/// 12 Minute, 14 Second, 17 Millisecond).
pub fn digit_count(p: Precision) -> u32 {
    match p {
        Precision::Year => 4,
        Precision::Month => 6,
        Precision::Week => unreachable!("Week is not a representable Date/DateTime/Time precision"),
        Precision::Day => 8,
        Precision::Hour => 10,
        Precision::Minute => 12,
        Precision::Second => 14,
        Precision::Millisecond => 17,
    }
}
