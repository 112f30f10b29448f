//! CF-convention helpers: locating the time axis of a file.

use expcat_netcdf::Header;
use expcat_types::{Calendar, TimeUnits};

/// The time coordinate of a file.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    /// Coordinate variable holding the time values.
    pub variable: String,
    /// Dimension the coordinate variable indexes.
    pub dimension: String,
    pub units: TimeUnits,
    /// `units` attribute as written in the file.
    pub units_attr: String,
    pub calendar: Calendar,
    /// Variable named by the `bounds` attribute, if present in the file.
    pub bounds: Option<String>,
}

/// Find the time axis among the 1-D coordinate variables whose `units`
/// parse as CF time units. Preference: `axis = "T"`, then the record
/// dimension, then a variable literally named `time`.
///
/// A recognised axis with an unknown calendar is an error.
pub fn find_time_axis(header: &Header) -> expcat_types::Result<Option<TimeAxis>> {
    let best = header
        .variables
        .iter()
        .filter(|v| header.is_coordinate_variable(v))
        .filter_map(|v| {
            let units_attr = v.text_attribute("units")?;
            let units = units_attr.parse::<TimeUnits>().ok()?;
            let rank = if v
                .text_attribute("axis")
                .is_some_and(|a| a.eq_ignore_ascii_case("T"))
            {
                0
            } else if header.is_record_variable(v) {
                1
            } else if v.name == "time" {
                2
            } else {
                3
            };
            Some((rank, v, units, units_attr))
        })
        .min_by_key(|(rank, ..)| *rank);

    let Some((_, var, units, units_attr)) = best else {
        return Ok(None);
    };

    let calendar = match var.text_attribute("calendar") {
        Some(name) => name.parse::<Calendar>()?,
        None => Calendar::default(),
    };

    let bounds = var
        .text_attribute("bounds")
        .filter(|b| header.variable(b).is_some())
        .map(str::to_string);

    Ok(Some(TimeAxis {
        variable: var.name.clone(),
        dimension: header.dimension_names(var).remove(0),
        units,
        units_attr: units_attr.to_string(),
        calendar,
        bounds,
    }))
}
