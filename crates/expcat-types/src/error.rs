use thiserror::Error;

/// Result type for expcat-types operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while parsing or converting calendar values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Date string could not be parsed or names an impossible date
    #[error("invalid date '{0}'")]
    InvalidDate(String),

    /// Calendar attribute is not one of the supported CF calendars
    #[error("unsupported calendar '{0}'")]
    UnknownCalendar(String),

    /// Units attribute is not of the form "<unit> since <reference>"
    #[error("invalid time units '{0}'")]
    InvalidTimeUnits(String),

    /// Frequency label could not be parsed
    #[error("invalid frequency '{0}'")]
    InvalidFrequency(String),

    /// Time value is not finite or overflows the representable range
    #[error("time value {0} cannot be converted to a date")]
    ValueOutOfRange(String),
}
