use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

const SECONDS_PER_DAY: i64 = 86_400;

const CUMULATIVE_DAYS_NOLEAP: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];
const CUMULATIVE_DAYS_LEAP: [i64; 12] = [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335];

/// CF calendar of a model time axis.
///
/// `standard` and `gregorian` are treated as proleptic Gregorian: model
/// output rarely straddles the 1582 switchover and the catalog only needs a
/// consistent ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Calendar {
    #[default]
    ProlepticGregorian,
    Julian,
    NoLeap,
    AllLeap,
    Day360,
}

impl Calendar {
    pub fn as_str(&self) -> &'static str {
        match self {
            Calendar::ProlepticGregorian => "proleptic_gregorian",
            Calendar::Julian => "julian",
            Calendar::NoLeap => "noleap",
            Calendar::AllLeap => "all_leap",
            Calendar::Day360 => "360_day",
        }
    }

    pub fn is_leap_year(&self, year: i64) -> bool {
        match self {
            Calendar::ProlepticGregorian => {
                year.rem_euclid(4) == 0 && (year.rem_euclid(100) != 0 || year.rem_euclid(400) == 0)
            }
            Calendar::Julian => year.rem_euclid(4) == 0,
            Calendar::NoLeap | Calendar::Day360 => false,
            Calendar::AllLeap => true,
        }
    }

    pub fn days_in_month(&self, year: i64, month: u32) -> u32 {
        if *self == Calendar::Day360 {
            return 30;
        }
        match month {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            2 if self.is_leap_year(year) => 29,
            2 => 28,
            _ => 0,
        }
    }

    /// Check that `date` names a real day in this calendar.
    pub fn validate(&self, date: &CalendarDate) -> Result<()> {
        if date.month == 0 || date.month > 12 || date.day == 0 {
            return Err(Error::InvalidDate(date.to_string()));
        }
        if date.day > self.days_in_month(date.year, date.month) {
            return Err(Error::InvalidDate(format!(
                "{} ({} calendar)",
                date,
                self.as_str()
            )));
        }
        Ok(())
    }

    /// Day number of a civil date. The epoch differs per calendar; only
    /// differences between day numbers of the same calendar are meaningful.
    pub fn day_number(&self, year: i64, month: u32, day: u32) -> i64 {
        let month = month as i64;
        let day = day as i64;
        match self {
            Calendar::ProlepticGregorian => {
                let y = if month <= 2 { year - 1 } else { year };
                let era = y.div_euclid(400);
                let yoe = y - era * 400;
                let mp = (month + 9) % 12;
                let doy = (153 * mp + 2) / 5 + day - 1;
                let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
                era * 146_097 + doe - 719_468
            }
            Calendar::Julian => {
                let y = if month <= 2 { year - 1 } else { year };
                let era = y.div_euclid(4);
                let yoe = y - era * 4;
                let mp = (month + 9) % 12;
                let doy = (153 * mp + 2) / 5 + day - 1;
                era * 1461 + yoe * 365 + doy
            }
            Calendar::NoLeap => year * 365 + CUMULATIVE_DAYS_NOLEAP[(month - 1) as usize] + day - 1,
            Calendar::AllLeap => year * 366 + CUMULATIVE_DAYS_LEAP[(month - 1) as usize] + day - 1,
            Calendar::Day360 => year * 360 + (month - 1) * 30 + day - 1,
        }
    }

    /// Inverse of [`Calendar::day_number`].
    pub fn civil_from_day_number(&self, days: i64) -> (i64, u32, u32) {
        match self {
            Calendar::ProlepticGregorian => {
                let z = days + 719_468;
                let era = z.div_euclid(146_097);
                let doe = z - era * 146_097;
                let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
                let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
                let (month, day) = march_based_month_day(doy);
                let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
                (year, month, day)
            }
            Calendar::Julian => {
                let era = days.div_euclid(1461);
                let doe = days - era * 1461;
                let yoe = (doe / 365).min(3);
                let doy = doe - yoe * 365;
                let (month, day) = march_based_month_day(doy);
                let year = yoe + era * 4 + if month <= 2 { 1 } else { 0 };
                (year, month, day)
            }
            Calendar::NoLeap => {
                let year = days.div_euclid(365);
                let doy = days.rem_euclid(365);
                let (month, day) = month_day_from_cumulative(&CUMULATIVE_DAYS_NOLEAP, doy);
                (year, month, day)
            }
            Calendar::AllLeap => {
                let year = days.div_euclid(366);
                let doy = days.rem_euclid(366);
                let (month, day) = month_day_from_cumulative(&CUMULATIVE_DAYS_LEAP, doy);
                (year, month, day)
            }
            Calendar::Day360 => {
                let year = days.div_euclid(360);
                let doy = days.rem_euclid(360);
                (year, (doy / 30 + 1) as u32, (doy % 30 + 1) as u32)
            }
        }
    }

    /// Seconds elapsed from `reference` to `date`.
    pub fn seconds_between(&self, reference: &CalendarDate, date: &CalendarDate) -> i64 {
        self.absolute_seconds(date) - self.absolute_seconds(reference)
    }

    /// `date` shifted by `seconds` (which may be negative).
    pub fn add_seconds(&self, date: &CalendarDate, seconds: i64) -> CalendarDate {
        let total = self.absolute_seconds(date) + seconds;
        let days = total.div_euclid(SECONDS_PER_DAY);
        let secs = total.rem_euclid(SECONDS_PER_DAY);
        let (year, month, day) = self.civil_from_day_number(days);
        CalendarDate {
            year,
            month,
            day,
            hour: (secs / 3600) as u32,
            minute: ((secs % 3600) / 60) as u32,
            second: (secs % 60) as u32,
        }
    }

    fn absolute_seconds(&self, date: &CalendarDate) -> i64 {
        self.day_number(date.year, date.month, date.day) * SECONDS_PER_DAY
            + date.hour as i64 * 3600
            + date.minute as i64 * 60
            + date.second as i64
    }
}

fn march_based_month_day(doy: i64) -> (u32, u32) {
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    (month as u32, day as u32)
}

fn month_day_from_cumulative(table: &[i64; 12], doy: i64) -> (u32, u32) {
    let idx = table.iter().rposition(|&start| start <= doy).unwrap_or(0);
    ((idx + 1) as u32, (doy - table[idx] + 1) as u32)
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Calendar {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "standard" | "gregorian" | "proleptic_gregorian" => {
                Ok(Calendar::ProlepticGregorian)
            }
            "julian" => Ok(Calendar::Julian),
            "noleap" | "no_leap" | "365_day" => Ok(Calendar::NoLeap),
            "all_leap" | "366_day" => Ok(Calendar::AllLeap),
            "360_day" => Ok(Calendar::Day360),
            other => Err(Error::UnknownCalendar(other.to_string())),
        }
    }
}

impl Serialize for Calendar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Calendar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A second-resolution civil date in some (implicit) calendar.
///
/// Field order gives the derived ordering: comparing two dates of the same
/// calendar compares them in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDate {
    pub year: i64,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl CalendarDate {
    pub fn ymd(year: i64, month: u32, day: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }

    pub fn with_time(mut self, hour: u32, minute: u32, second: u32) -> Self {
        self.hour = hour;
        self.minute = minute;
        self.second = second;
        self
    }

    /// Monotonic integer key, independent of calendar, used for SQL ordering.
    pub fn sort_key(&self) -> i64 {
        self.year
            .saturating_mul(12)
            .saturating_add(self.month as i64 - 1)
            .saturating_mul(31)
            .saturating_add(self.day as i64 - 1)
            .saturating_mul(24)
            .saturating_add(self.hour as i64)
            .saturating_mul(60)
            .saturating_add(self.minute as i64)
            .saturating_mul(60)
            .saturating_add(self.second as i64)
    }

    /// Whole-month distance from `self` to `other`, ignoring day and time.
    pub fn months_until(&self, other: &CalendarDate) -> i64 {
        (other.year * 12 + other.month as i64) - (self.year * 12 + self.month as i64)
    }

    /// True when day-of-month and time of day are identical.
    pub fn same_day_and_time(&self, other: &CalendarDate) -> bool {
        (self.day, self.hour, self.minute, self.second)
            == (other.day, other.hour, other.minute, other.second)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.year < 0 {
            write!(f, "-{:04}", self.year.unsigned_abs())?;
        } else {
            write!(f, "{:04}", self.year)?;
        }
        write!(
            f,
            "-{:02}-{:02} {:02}:{:02}:{:02}",
            self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(-?\d+)(?:-(\d{1,2})(?:-(\d{1,2}))?)?(?:[ T]+(\d{1,2})(?::(\d{1,2})(?::(\d{1,2})(?:\.\d*)?)?)?)?\s*(?:Z|UTC)?\s*$",
    )
    .expect("date regex is valid")
});

impl FromStr for CalendarDate {
    type Err = Error;

    /// Accepts `YYYY`, `YYYY-MM`, `YYYY-MM-DD` with an optional
    /// `[ T]HH[:MM[:SS[.frac]]]` and trailing `Z`. Day validity against a
    /// calendar is checked separately with [`Calendar::validate`].
    fn from_str(s: &str) -> Result<Self> {
        let caps = DATE_RE
            .captures(s)
            .ok_or_else(|| Error::InvalidDate(s.to_string()))?;

        let invalid = || Error::InvalidDate(s.to_string());
        let year: i64 = caps[1].parse().map_err(|_| invalid())?;
        let field = |idx: usize, default: u32| -> Result<u32> {
            caps.get(idx)
                .map(|m| m.as_str().parse::<u32>().map_err(|_| invalid()))
                .unwrap_or(Ok(default))
        };

        let date = CalendarDate {
            year,
            month: field(2, 1)?,
            day: field(3, 1)?,
            hour: field(4, 0)?,
            minute: field(5, 0)?,
            second: field(6, 0)?,
        };

        if !(1..=12).contains(&date.month)
            || !(1..=31).contains(&date.day)
            || date.hour > 23
            || date.minute > 59
            || date.second > 59
        {
            return Err(invalid());
        }

        Ok(date)
    }
}

impl Serialize for CalendarDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CalendarDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
