//! Conversion of the values a user types into the representation the database compares.
//!
//! Durations converge on [`Interval`], concentrations on micromolar. A value that does not parse in
//! the chosen units is compared as typed instead, with a warning.

use thiserror::Error;

use query_engine_metadata::metadata::UnitsFamily;

use super::predicate::{Interval, Value};
use crate::translation::error::Error;
use crate::translation::helpers::FieldCatalog;

/// A value could not be read in the chosen units.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConversionError(pub String);

fn conversion_error(message: impl Into<String>) -> ConversionError {
    ConversionError(message.into())
}

/// Convert the raw value of a condition on `field_path` typed in `units`.
pub fn convert(
    catalog: &FieldCatalog,
    field_path: &str,
    units: &str,
    raw: &str,
) -> Result<Value, Error> {
    let entry = catalog.lookup(field_path)?;
    let spec = entry.meta.units_spec();
    if !spec.is_selectable(units) {
        return Err(Error::InvalidUnits {
            path: field_path.to_string(),
            units: units.to_string(),
        });
    }
    match convert_value(spec.family, units, raw) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Ok(Value::String(raw.to_string())),
        Err(err) => {
            tracing::warn!(
                field = field_path,
                units,
                value = raw,
                error = %err,
                "units conversion failed, comparing the value as typed"
            );
            Ok(Value::String(raw.to_string()))
        }
    }
}

/// The converted value, or `None` for units compared as typed.
pub fn convert_value(
    family: UnitsFamily,
    units: &str,
    raw: &str,
) -> Result<Option<Value>, ConversionError> {
    let raw = raw.trim();
    match family {
        UnitsFamily::Identity => Ok(None),
        UnitsFamily::PostgresInterval => {
            let interval = match units {
                "native" => parse_interval(raw)?,
                "calendartime" => parse_iso8601_duration(raw)?,
                "clocktime" => {
                    let mut accumulator = IntervalAccumulator::default();
                    accumulator.microseconds = parse_clock_time(raw)?;
                    accumulator.finish()?
                }
                key => {
                    let unit = IntervalUnit::from_units_key(key).ok_or_else(|| {
                        conversion_error(format!("unknown duration units '{key}'"))
                    })?;
                    let mut accumulator = IntervalAccumulator::default();
                    accumulator.add(parse_number(raw)?, unit);
                    accumulator.finish()?
                }
            };
            Ok(Some(Value::Interval(interval)))
        }
        UnitsFamily::Concentration => {
            let micromolar_per_unit = match units {
                "molar" => 1e6,
                "millimolar" => 1e3,
                "micromolar" => 1.0,
                "nanomolar" => 1e-3,
                other => {
                    return Err(conversion_error(format!(
                        "unknown concentration units '{other}'"
                    )))
                }
            };
            Ok(Some(Value::Float(parse_number(raw)? * micromolar_per_unit)))
        }
    }
}

fn parse_number(text: &str) -> Result<f64, ConversionError> {
    match text.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(number),
        _ => Err(conversion_error(format!("'{text}' is not a number"))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IntervalUnit {
    Microsecond,
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
    Decade,
    Century,
    Millennium,
}

impl IntervalUnit {
    /// The single-unit keys offered to the user.
    fn from_units_key(key: &str) -> Option<IntervalUnit> {
        match key {
            "millis" => Some(IntervalUnit::Millisecond),
            "seconds" => Some(IntervalUnit::Second),
            "minutes" => Some(IntervalUnit::Minute),
            "hours" => Some(IntervalUnit::Hour),
            "days" => Some(IntervalUnit::Day),
            "weeks" => Some(IntervalUnit::Week),
            "months" => Some(IntervalUnit::Month),
            "years" => Some(IntervalUnit::Year),
            "decades" => Some(IntervalUnit::Decade),
            "centuries" => Some(IntervalUnit::Century),
            "millennia" => Some(IntervalUnit::Millennium),
            _ => None,
        }
    }

    /// Unit words of the PostgreSQL interval syntax.
    fn from_word(word: &str) -> Option<IntervalUnit> {
        match word.to_ascii_lowercase().as_str() {
            "microsecond" | "microseconds" | "us" | "usec" | "usecs" => {
                Some(IntervalUnit::Microsecond)
            }
            "millisecond" | "milliseconds" | "ms" | "msec" | "msecs" => {
                Some(IntervalUnit::Millisecond)
            }
            "second" | "seconds" | "s" | "sec" | "secs" => Some(IntervalUnit::Second),
            "minute" | "minutes" | "m" | "min" | "mins" => Some(IntervalUnit::Minute),
            "hour" | "hours" | "h" | "hr" | "hrs" => Some(IntervalUnit::Hour),
            "day" | "days" | "d" => Some(IntervalUnit::Day),
            "week" | "weeks" | "w" => Some(IntervalUnit::Week),
            "mon" | "mons" | "month" | "months" => Some(IntervalUnit::Month),
            "year" | "years" | "y" | "yr" | "yrs" => Some(IntervalUnit::Year),
            "decade" | "decades" => Some(IntervalUnit::Decade),
            "century" | "centuries" => Some(IntervalUnit::Century),
            "millennium" | "millennia" | "millenniums" => Some(IntervalUnit::Millennium),
            _ => None,
        }
    }
}

/// Fractional amounts spill over into the next smaller field the way PostgreSQL does it: a month
/// is 30 days, a day 24 hours.
#[derive(Debug, Clone, Copy, Default)]
struct IntervalAccumulator {
    months: f64,
    days: f64,
    microseconds: f64,
}

impl IntervalAccumulator {
    fn add(&mut self, amount: f64, unit: IntervalUnit) {
        match unit {
            IntervalUnit::Microsecond => self.microseconds += amount,
            IntervalUnit::Millisecond => self.microseconds += amount * 1e3,
            IntervalUnit::Second => self.microseconds += amount * 1e6,
            IntervalUnit::Minute => self.microseconds += amount * 6e7,
            IntervalUnit::Hour => self.microseconds += amount * 3.6e9,
            IntervalUnit::Day => self.days += amount,
            IntervalUnit::Week => self.days += amount * 7.0,
            IntervalUnit::Month => self.months += amount,
            IntervalUnit::Year => self.months += amount * 12.0,
            IntervalUnit::Decade => self.months += amount * 120.0,
            IntervalUnit::Century => self.months += amount * 1200.0,
            IntervalUnit::Millennium => self.months += amount * 12000.0,
        }
    }

    fn negate(&mut self) {
        self.months = -self.months;
        self.days = -self.days;
        self.microseconds = -self.microseconds;
    }

    #[allow(clippy::cast_possible_truncation)]
    fn finish(self) -> Result<Interval, ConversionError> {
        let months = self.months.trunc();
        let days = self.days + (self.months - months) * 30.0;
        let whole_days = days.trunc();
        let microseconds = (self.microseconds + (days - whole_days) * 86_400e6).round();

        let fits_i32 = |n: f64| n >= f64::from(i32::MIN) && n <= f64::from(i32::MAX);
        if !fits_i32(months) || !fits_i32(whole_days) || microseconds.abs() >= 9.2e18 {
            return Err(conversion_error("interval out of range"));
        }
        Ok(Interval {
            months: months as i32,
            days: whole_days as i32,
            microseconds: microseconds as i64,
        })
    }
}

/// Parse `[-]hh:mm[:ss[.ffffff]]` into microseconds.
fn parse_clock_time(text: &str) -> Result<f64, ConversionError> {
    let (sign, clock) = match text.trim().strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, text.trim().trim_start_matches('+')),
    };
    let parts: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [hours, minutes] => (*hours, *minutes, "0"),
        [hours, minutes, seconds] => (*hours, *minutes, *seconds),
        _ => return Err(conversion_error(format!("'{text}' is not a clock time"))),
    };
    let whole = |part: &str| -> Result<f64, ConversionError> {
        if !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()) {
            parse_number(part)
        } else {
            Err(conversion_error(format!("'{text}' is not a clock time")))
        }
    };
    let seconds = parse_number(seconds)?;
    if seconds < 0.0 {
        return Err(conversion_error(format!("'{text}' is not a clock time")));
    }
    Ok(sign * ((whole(hours)? * 3600.0 + whole(minutes)? * 60.0 + seconds) * 1e6))
}

/// Parse PostgreSQL interval notation, e.g. `1 year 2 mons 3 days 04:05:06`, `3 days ago` or
/// `@ 2 weeks`. A number without a unit counts seconds.
pub fn parse_interval(text: &str) -> Result<Interval, ConversionError> {
    let mut accumulator = IntervalAccumulator::default();
    let mut parsed_any = false;
    let mut ago = false;
    let mut tokens = text.split_whitespace().peekable();
    while let Some(token) = tokens.next() {
        if token == "@" {
            continue;
        }
        if token.eq_ignore_ascii_case("ago") {
            ago = true;
            continue;
        }
        if token.contains(':') {
            accumulator.microseconds += parse_clock_time(token)?;
            parsed_any = true;
            continue;
        }
        let split = token
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
            .unwrap_or(token.len());
        let (number, fused_unit) = token.split_at(split);
        let amount = parse_number(number)?;
        let unit = if !fused_unit.is_empty() {
            IntervalUnit::from_word(fused_unit)
        } else {
            match tokens.peek() {
                Some(word) if word.contains(':') => Some(IntervalUnit::Second),
                Some(word) if parse_number(word).is_ok() => {
                    return Err(conversion_error(format!(
                        "'{text}' has consecutive numbers without units"
                    )));
                }
                Some(word) => {
                    let unit = IntervalUnit::from_word(word);
                    tokens.next();
                    unit
                }
                None => Some(IntervalUnit::Second),
            }
        }
        .ok_or_else(|| conversion_error(format!("'{text}' has an unknown unit")))?;
        accumulator.add(amount, unit);
        parsed_any = true;
    }
    if !parsed_any {
        return Err(conversion_error(format!("'{text}' is not an interval")));
    }
    if ago {
        accumulator.negate();
    }
    accumulator.finish()
}

/// Parse an ISO 8601 duration such as `P1Y2M3DT4H5M6S` or `P2W`.
fn parse_iso8601_duration(text: &str) -> Result<Interval, ConversionError> {
    let upper = text.trim().to_ascii_uppercase();
    let body = upper
        .strip_prefix('P')
        .ok_or_else(|| conversion_error(format!("'{text}' is not an ISO 8601 duration")))?;
    let (date, time) = match body.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (body, None),
    };

    let mut accumulator = IntervalAccumulator::default();
    let mut parsed_any = parse_designated(date, &mut accumulator, |designator| match designator {
        'Y' => Some(IntervalUnit::Year),
        'M' => Some(IntervalUnit::Month),
        'W' => Some(IntervalUnit::Week),
        'D' => Some(IntervalUnit::Day),
        _ => None,
    })?;
    if let Some(time) = time {
        let parsed_time = parse_designated(time, &mut accumulator, |designator| match designator {
            'H' => Some(IntervalUnit::Hour),
            'M' => Some(IntervalUnit::Minute),
            'S' => Some(IntervalUnit::Second),
            _ => None,
        })?;
        if !parsed_time {
            return Err(conversion_error(format!("'{text}' has an empty time part")));
        }
        parsed_any = true;
    }
    if !parsed_any {
        return Err(conversion_error(format!("'{text}' is an empty duration")));
    }
    accumulator.finish()
}

/// Read `<number><designator>` pairs, returning whether there were any.
fn parse_designated(
    text: &str,
    accumulator: &mut IntervalAccumulator,
    designator_unit: impl Fn(char) -> Option<IntervalUnit>,
) -> Result<bool, ConversionError> {
    let mut number = String::new();
    let mut parsed_any = false;
    for c in text.chars() {
        match c {
            '0'..='9' | '.' | '-' => number.push(c),
            ',' => number.push('.'),
            designator => {
                let unit = designator_unit(designator)
                    .ok_or_else(|| conversion_error(format!("unexpected '{designator}'")))?;
                accumulator.add(parse_number(&number)?, unit);
                number.clear();
                parsed_any = true;
            }
        }
    }
    if !number.is_empty() {
        return Err(conversion_error(format!("'{number}' has no designator")));
    }
    Ok(parsed_any)
}
