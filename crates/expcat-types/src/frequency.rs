use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FrequencyUnit {
    Hourly,
    Daily,
    Monthly,
    Yearly,
}

impl FrequencyUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrequencyUnit::Hourly => "hourly",
            FrequencyUnit::Daily => "daily",
            FrequencyUnit::Monthly => "monthly",
            FrequencyUnit::Yearly => "yearly",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "hourly" | "hour" | "hr" => Some(FrequencyUnit::Hourly),
            "daily" | "day" => Some(FrequencyUnit::Daily),
            "monthly" | "month" | "mon" => Some(FrequencyUnit::Monthly),
            "yearly" | "year" | "annual" | "yr" => Some(FrequencyUnit::Yearly),
            _ => None,
        }
    }
}

/// Sampling interval label of a variable's time axis, e.g. `1 monthly`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Frequency {
    /// No time axis, a single sample, or irregular spacing.
    #[default]
    Static,
    Periodic { unit: FrequencyUnit, count: u32 },
}

impl Frequency {
    pub fn periodic(count: u32, unit: FrequencyUnit) -> Self {
        Frequency::Periodic { count, unit }
    }

    pub fn monthly() -> Self {
        Frequency::periodic(1, FrequencyUnit::Monthly)
    }

    pub fn daily() -> Self {
        Frequency::periodic(1, FrequencyUnit::Daily)
    }

    pub fn yearly() -> Self {
        Frequency::periodic(1, FrequencyUnit::Yearly)
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Frequency::Static)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Static => f.write_str("static"),
            Frequency::Periodic { count, unit } => write!(f, "{} {}", count, unit.as_str()),
        }
    }
}

impl FromStr for Frequency {
    type Err = Error;

    /// Accepts `static`/`fx`, a bare unit (`monthly`) or `N unit`.
    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        let invalid = || Error::InvalidFrequency(s.to_string());
        let parts: Vec<&str> = lowered.split_whitespace().collect();

        match parts.as_slice() {
            ["static"] | ["fx"] => Ok(Frequency::Static),
            [unit] => FrequencyUnit::parse(unit)
                .map(|unit| Frequency::Periodic { count: 1, unit })
                .ok_or_else(invalid),
            [count, unit] => {
                let count: u32 = count.parse().map_err(|_| invalid())?;
                if count == 0 {
                    return Err(invalid());
                }
                let unit = FrequencyUnit::parse(unit).ok_or_else(invalid)?;
                Ok(Frequency::Periodic { count, unit })
            }
            _ => Err(invalid()),
        }
    }
}

impl Serialize for Frequency {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Frequency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(Frequency::monthly().to_string(), "1 monthly");
        assert_eq!(
            Frequency::periodic(3, FrequencyUnit::Hourly).to_string(),
            "3 hourly"
        );
        assert_eq!(Frequency::Static.to_string(), "static");
    }

    #[test]
    fn test_parse_labels() {
        assert_eq!("1 monthly".parse::<Frequency>().unwrap(), Frequency::monthly());
        assert_eq!("daily".parse::<Frequency>().unwrap(), Frequency::daily());
        assert_eq!("fx".parse::<Frequency>().unwrap(), Frequency::Static);
        assert_eq!(
            " 5 DAILY ".parse::<Frequency>().unwrap(),
            Frequency::periodic(5, FrequencyUnit::Daily)
        );
        assert!("0 daily".parse::<Frequency>().is_err());
        assert!("fortnightly".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_static_sorts_first() {
        let mut labels = vec![Frequency::yearly(), Frequency::Static, Frequency::daily()];
        labels.sort();
        assert_eq!(labels, vec![Frequency::Static, Frequency::daily(), Frequency::yearly()]);
    }
}
