use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::calendar::{Calendar, CalendarDate};
use crate::{Error, Result};

/// Step unit of a CF time axis. Months and years are not fixed-length and
/// are rejected, matching CF guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    pub fn seconds(&self) -> i64 {
        match self {
            TimeUnit::Seconds => 1,
            TimeUnit::Minutes => 60,
            TimeUnit::Hours => 3600,
            TimeUnit::Days => 86_400,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "seconds" | "second" | "secs" | "sec" | "s" => Some(TimeUnit::Seconds),
            "minutes" | "minute" | "mins" | "min" => Some(TimeUnit::Minutes),
            "hours" | "hour" | "hrs" | "hr" | "h" => Some(TimeUnit::Hours),
            "days" | "day" | "d" => Some(TimeUnit::Days),
            _ => None,
        }
    }
}

static UNITS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*([a-z]+)\s+since\s+(.+?)\s*$").expect("units regex is valid"));

/// Parsed CF time units, e.g. `days since 1900-01-01 00:00:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub reference: CalendarDate,
}

impl TimeUnits {
    pub fn new(unit: TimeUnit, reference: CalendarDate) -> Self {
        Self { unit, reference }
    }

    /// Convert a raw axis value into a date, rounding to whole seconds.
    pub fn decode(&self, value: f64, calendar: Calendar) -> Result<CalendarDate> {
        let seconds = value * self.unit.seconds() as f64;
        if !seconds.is_finite() || seconds.abs() > i64::MAX as f64 / 2.0 {
            return Err(Error::ValueOutOfRange(value.to_string()));
        }
        Ok(calendar.add_seconds(&self.reference, seconds.round() as i64))
    }

    /// Convert a date into a raw axis value in these units.
    pub fn encode(&self, date: &CalendarDate, calendar: Calendar) -> f64 {
        calendar.seconds_between(&self.reference, date) as f64 / self.unit.seconds() as f64
    }

    /// Amount to add to values in `self` units so they are expressed in
    /// `target` units instead.
    pub fn rebase_offset(&self, target: &TimeUnits, calendar: Calendar) -> f64 {
        let shift = calendar.seconds_between(&target.reference, &self.reference) as f64;
        shift / target.unit.seconds() as f64
    }
}

impl fmt::Display for TimeUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} since {}", self.unit.as_str(), self.reference)
    }
}

impl FromStr for TimeUnits {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = UNITS_RE
            .captures(s)
            .ok_or_else(|| Error::InvalidTimeUnits(s.to_string()))?;
        let unit = TimeUnit::parse(&caps[1]).ok_or_else(|| Error::InvalidTimeUnits(s.to_string()))?;
        let reference = caps[2]
            .parse::<CalendarDate>()
            .map_err(|_| Error::InvalidTimeUnits(s.to_string()))?;
        Ok(Self { unit, reference })
    }
}

impl Serialize for TimeUnits {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeUnits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
