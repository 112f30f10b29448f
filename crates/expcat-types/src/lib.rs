pub mod calendar;
pub mod domain;
pub mod error;
pub mod frequency;
pub mod units;

pub use calendar::{Calendar, CalendarDate};
pub use domain::*;
pub use error::{Error, Result};
pub use frequency::{Frequency, FrequencyUnit};
pub use units::{TimeUnit, TimeUnits};
