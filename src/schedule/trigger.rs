// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Schedule expressions: `@` descriptors and five-field cron lines.
//!
//! Expressions starting with `@` are only parsed as descriptors
//! (`@hourly`, `@every 90m`, ...). Everything else must be a standard
//! `minute hour day-of-month month day-of-week` line. Firing times are UTC.

use chrono::{DateTime, Datelike, TimeDelta, TimeZone, Timelike, Utc};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TriggerError {
    #[error("empty schedule expression")]
    Empty,

    #[error("unrecognized descriptor '{0}'")]
    UnknownDescriptor(String),

    #[error("invalid duration '{0}'")]
    InvalidDuration(String),

    #[error("expected 5 fields (minute hour day-of-month month day-of-week), found {0}")]
    FieldCount(usize),

    #[error("invalid {field} field '{value}': {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// A parsed schedule expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Fixed interval between firings (`@every <duration>`)
    Every(Duration),
    Cron(CronExpr),
}

impl Trigger {
    /// The first firing strictly after `after`, if any within the search horizon
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Every(interval) => {
                let interval = TimeDelta::from_std(*interval).ok()?;
                after.checked_add_signed(interval)
            }
            Trigger::Cron(expr) => expr.next_after(after),
        }
    }
}

impl FromStr for Trigger {
    type Err = TriggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TriggerError::Empty);
        }
        if s.starts_with('@') {
            parse_descriptor(s)
        } else {
            CronExpr::from_str(s).map(Trigger::Cron)
        }
    }
}

fn parse_descriptor(s: &str) -> Result<Trigger, TriggerError> {
    let line = match s {
        "@yearly" | "@annually" => "0 0 1 1 *",
        "@monthly" => "0 0 1 * *",
        "@weekly" => "0 0 * * 0",
        "@daily" | "@midnight" => "0 0 * * *",
        "@hourly" => "0 * * * *",
        _ => {
            let Some(duration) = s.strip_prefix("@every ") else {
                return Err(TriggerError::UnknownDescriptor(s.to_string()));
            };
            let interval = parse_duration(duration.trim())?;
            // Sub-second intervals are raised to one second
            return Ok(Trigger::Every(interval.max(Duration::from_secs(1))));
        }
    };
    CronExpr::from_str(line).map(Trigger::Cron)
}

/// Parse durations like `1h`, `1h30m`, `1.5h`, `90s` or `250ms`
fn parse_duration(s: &str) -> Result<Duration, TriggerError> {
    let invalid = || TriggerError::InvalidDuration(s.to_string());

    let mut rest = s.strip_prefix('+').unwrap_or(s);
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total_nanos: f64 = 0.0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let (number, tail) = rest.split_at(number_len);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);

        let nanos_per_unit: f64 = match unit {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            _ => return Err(invalid()),
        };
        let value: f64 = number.parse().map_err(|_| invalid())?;
        total_nanos += value * nanos_per_unit;
        rest = tail;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
    /// Symbolic names mapping to `min + index`
    names: &'static [&'static str],
}

const MINUTE: FieldSpec = FieldSpec { name: "minute", min: 0, max: 59, names: &[] };
const HOUR: FieldSpec = FieldSpec { name: "hour", min: 0, max: 23, names: &[] };
const DAY_OF_MONTH: FieldSpec = FieldSpec { name: "day-of-month", min: 1, max: 31, names: &[] };
const MONTH: FieldSpec = FieldSpec {
    name: "month",
    min: 1,
    max: 12,
    names: &["JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC"],
};
const DAY_OF_WEEK: FieldSpec = FieldSpec {
    name: "day-of-week",
    min: 0,
    max: 6,
    names: &["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"],
};

/// A standard five-field cron expression, stored as one bitmask per field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    minutes: u64,
    hours: u64,
    days_of_month: u64,
    months: u64,
    days_of_week: u64,
    /// Whether the day fields were unrestricted (`*` or `?`)
    dom_any: bool,
    dow_any: bool,
}

/// Years searched ahead before giving up on an expression that never matches
const SEARCH_HORIZON_YEARS: i32 = 5;

impl CronExpr {
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut t = after.with_second(0)?.with_nanosecond(0)? + TimeDelta::minutes(1);
        let horizon = t.year() + SEARCH_HORIZON_YEARS;

        while t.year() <= horizon {
            if !has_bit(self.months, t.month()) {
                let (year, month) = if t.month() == 12 {
                    (t.year() + 1, 1)
                } else {
                    (t.year(), t.month() + 1)
                };
                t = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()?;
                continue;
            }
            if !self.day_matches(&t) {
                t = t.date_naive().succ_opt()?.and_hms_opt(0, 0, 0)?.and_utc();
                continue;
            }
            if !has_bit(self.hours, t.hour()) {
                t = t.with_minute(0)? + TimeDelta::hours(1);
                continue;
            }
            if !has_bit(self.minutes, t.minute()) {
                t += TimeDelta::minutes(1);
                continue;
            }
            return Some(t);
        }
        None
    }

    fn day_matches(&self, t: &DateTime<Utc>) -> bool {
        let dom = has_bit(self.days_of_month, t.day());
        let dow = has_bit(self.days_of_week, t.weekday().num_days_from_sunday());
        if self.dom_any || self.dow_any {
            dom && dow
        } else {
            dom || dow
        }
    }
}

impl FromStr for CronExpr {
    type Err = TriggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        if fields.is_empty() {
            return Err(TriggerError::Empty);
        }
        if fields.len() != 5 {
            return Err(TriggerError::FieldCount(fields.len()));
        }

        let (minutes, _) = parse_field(fields[0], &MINUTE)?;
        let (hours, _) = parse_field(fields[1], &HOUR)?;
        let (days_of_month, dom_any) = parse_field(fields[2], &DAY_OF_MONTH)?;
        let (months, _) = parse_field(fields[3], &MONTH)?;
        let (days_of_week, dow_any) = parse_field(fields[4], &DAY_OF_WEEK)?;

        Ok(CronExpr {
            minutes,
            hours,
            days_of_month,
            months,
            days_of_week,
            dom_any,
            dow_any,
        })
    }
}

fn has_bit(bits: u64, value: u32) -> bool {
    bits & (1 << value) != 0
}

/// Parse one comma-separated field into a bitmask, plus whether it was a bare wildcard
fn parse_field(expr: &str, spec: &FieldSpec) -> Result<(u64, bool), TriggerError> {
    let invalid = |reason: String| TriggerError::InvalidField {
        field: spec.name,
        value: expr.to_string(),
        reason,
    };

    let mut bits = 0u64;
    let mut any = false;

    for part in expr.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| invalid(format!("bad step '{}'", step)))?;
                if step == 0 {
                    return Err(invalid("step must be at least 1".to_string()));
                }
                (range, Some(step))
            }
            None => (part, None),
        };

        let (start, end) = if range == "*" || range == "?" {
            if step.unwrap_or(1) == 1 {
                any = true;
            }
            (spec.min, spec.max)
        } else if let Some((low, high)) = range.split_once('-') {
            (parse_value(low, spec, &invalid)?, parse_value(high, spec, &invalid)?)
        } else {
            let start = parse_value(range, spec, &invalid)?;
            // `n/step` runs from n to the end of the field
            let end = if step.is_some() { spec.max } else { start };
            (start, end)
        };

        if start < spec.min || end > spec.max {
            return Err(invalid(format!(
                "value out of range {}-{}",
                spec.min, spec.max
            )));
        }
        if start > end {
            return Err(invalid(format!("range start {} exceeds end {}", start, end)));
        }

        let step = step.unwrap_or(1);
        let mut value = start;
        while value <= end {
            bits |= 1 << value;
            match value.checked_add(step) {
                Some(next) => value = next,
                None => break,
            }
        }
    }

    Ok((bits, any))
}

fn parse_value(
    raw: &str,
    spec: &FieldSpec,
    invalid: &impl Fn(String) -> TriggerError,
) -> Result<u32, TriggerError> {
    if raw.is_empty() {
        return Err(invalid("empty value".to_string()));
    }
    if let Ok(value) = raw.parse::<u32>() {
        return Ok(value);
    }
    spec.names
        .iter()
        .position(|name| name.eq_ignore_ascii_case(raw))
        .map(|index| spec.min + index as u32)
        .ok_or_else(|| invalid(format!("unknown value '{}'", raw)))
}
