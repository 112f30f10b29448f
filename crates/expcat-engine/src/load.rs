//! Building a lazy array from an ordered list of files.
//!
//! Only headers, the time coordinate and the first file's 1-D coordinates
//! are read here. Variable data waits for [`LazyArray::force`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use expcat_netcdf::{Header, NcReader};
use expcat_scanner::{TimeAxis, find_time_axis};
use expcat_types::{CalendarDate, TimeUnits};
use tracing::{debug, info};

use crate::array::{Coordinate, LazyArray};
use crate::chunks::ChunkGrid;
use crate::options::GetVarOptions;
use crate::plan::{AccessPlan, Packing, Segment};
use crate::{Error, Result};

/// What one file says about the variable being loaded.
struct FileView {
    path: PathBuf,
    dims: Vec<String>,
    shape: Vec<usize>,
    units: Option<String>,
    attrs: BTreeMap<String, String>,
    packing: Packing,
    /// Present when the variable's leading dimension is the time axis.
    time: Option<FileTime>,
}

struct FileTime {
    axis: TimeAxis,
    values: Vec<f64>,
}

fn open(path: &Path) -> Result<Box<dyn NcReader>> {
    expcat_netcdf::open(path).map_err(Error::netcdf(path))
}

fn inspect(path: &Path, reader: &mut dyn NcReader, variable: &str) -> Result<FileView> {
    let header = reader.header();
    let var = header
        .require_variable(variable)
        .map_err(Error::netcdf(path))?;
    let dims = header.dimension_names(var);
    let shape = header.shape(var);
    let units = var.text_attribute("units").map(str::to_string);
    let attrs = var
        .attributes
        .iter()
        .filter_map(|a| Some((a.name.clone(), a.value.as_text()?.to_string())))
        .collect();
    let packing = Packing::from_variable(var);

    let axis = find_time_axis(header)
        .map_err(Error::time(path))?
        .filter(|axis| dims.first() == Some(&axis.dimension));

    let time = match axis {
        Some(axis) => {
            let values = reader
                .read_all(&axis.variable)
                .map_err(Error::netcdf(path))?;
            Some(FileTime { axis, values })
        }
        None => None,
    };

    Ok(FileView {
        path: path.to_path_buf(),
        dims,
        shape,
        units,
        attrs,
        packing,
        time,
    })
}

/// Numeric 1-D coordinate variables for the non-time dimensions.
fn coordinates(path: &Path, reader: &mut dyn NcReader, view: &FileView) -> Result<Vec<Coordinate>> {
    let skip = view.time.as_ref().map(|t| t.axis.dimension.as_str());
    let wanted: Vec<(String, Option<String>)> = {
        let header: &Header = reader.header();
        view.dims
            .iter()
            .filter(|d| Some(d.as_str()) != skip)
            .filter_map(|d| header.variable(d))
            .filter(|v| header.is_coordinate_variable(v))
            .map(|v| (v.name.clone(), v.text_attribute("units").map(str::to_string)))
            .collect()
    };

    let mut coords = Vec::with_capacity(wanted.len());
    for (name, units) in wanted {
        match reader.read_all(&name) {
            Ok(values) => coords.push(Coordinate::Values {
                name,
                units,
                values,
            }),
            Err(expcat_netcdf::Error::NotNumeric(_)) => {
                debug!(coordinate = %name, "skipping character coordinate");
            }
            Err(e) => return Err(Error::netcdf(path)(e)),
        }
    }
    Ok(coords)
}

fn check_compatible(first: &FileView, other: &FileView) -> Result<()> {
    let incompatible = |reason: String| {
        Err(Error::IncompatibleFile {
            path: other.path.clone(),
            reason,
        })
    };

    if other.dims != first.dims {
        return incompatible(format!(
            "dimensions ({}) differ from ({}) in {}",
            other.dims.join(", "),
            first.dims.join(", "),
            first.path.display()
        ));
    }
    if other.shape.get(1..) != first.shape.get(1..) {
        return incompatible(format!(
            "non-time extents {:?} differ from {:?} in {}",
            other.shape.get(1..).unwrap_or_default(),
            first.shape.get(1..).unwrap_or_default(),
            first.path.display()
        ));
    }
    if other.units != first.units {
        return incompatible(format!(
            "units {:?} differ from {:?} in {}",
            other.units.as_deref().unwrap_or(""),
            first.units.as_deref().unwrap_or(""),
            first.path.display()
        ));
    }
    match (&first.time, &other.time) {
        (Some(a), Some(b)) if a.axis.calendar != b.axis.calendar => incompatible(format!(
            "calendar {} differs from {} in {}",
            b.axis.calendar,
            a.axis.calendar,
            first.path.display()
        )),
        (Some(_), None) => incompatible("variable has no time axis".to_string()),
        _ => Ok(()),
    }
}

/// Time steps of one file that survive the offset and window, with their
/// values re-expressed in `base` units.
struct Steps {
    range: std::ops::Range<usize>,
    values: Vec<f64>,
    dates: Vec<CalendarDate>,
}

fn select_steps(view: &FileView, base: &TimeUnits, options: &GetVarOptions) -> Result<Steps> {
    let mut steps = Steps {
        range: 0..0,
        values: Vec::new(),
        dates: Vec::new(),
    };
    let Some(time) = &view.time else {
        return Ok(steps);
    };

    let units = &time.axis.units;
    let calendar = time.axis.calendar;
    let offset = options.offset.unwrap_or(0) as f64;
    let (from_secs, to_secs) = (units.unit.seconds() as f64, base.unit.seconds() as f64);
    let shift = units.rebase_offset(base, calendar);

    let mut dates = Vec::with_capacity(time.values.len());
    for raw in &time.values {
        match units.decode(raw + offset, calendar) {
            Ok(date) => dates.push(date),
            Err(source) => {
                return Err(Error::Time {
                    path: view.path.clone(),
                    source,
                });
            }
        }
    }

    let first = dates.iter().position(|d| options.in_window(d));
    let last = dates.iter().rposition(|d| options.in_window(d));
    if let (Some(first), Some(last)) = (first, last) {
        steps.range = first..last + 1;
        steps.values = time.values[first..=last]
            .iter()
            .map(|raw| (raw + offset) * from_secs / to_secs + shift)
            .collect();
        dates.truncate(last + 1);
        steps.dates = dates.split_off(first);
    }
    Ok(steps)
}

/// Plan the concatenation of `variable` across `paths` (already in time
/// order and already narrowed by `n`).
pub fn open_variable(variable: &str, paths: &[PathBuf], options: &GetVarOptions) -> Result<LazyArray> {
    options.validate()?;
    let Some(first_path) = paths.first() else {
        return Err(Error::InvalidOptions(format!(
            "no files selected for '{}'",
            variable
        )));
    };

    let (first, coords) = {
        let mut reader = open(first_path)?;
        let view = inspect(first_path, reader.as_mut(), variable)?;
        let coords = coordinates(first_path, reader.as_mut(), &view)?;
        (view, coords)
    };

    if first.time.is_some() {
        open_time_series(variable, paths, first, coords, options)
    } else {
        open_static(variable, first, coords, options)
    }
}

fn open_static(
    variable: &str,
    first: FileView,
    coords: Vec<Coordinate>,
    options: &GetVarOptions,
) -> Result<LazyArray> {
    if options.has_window() {
        return Err(Error::InvalidOptions(format!(
            "'{}' has no time axis, so start/end times cannot be applied",
            variable
        )));
    }

    let leading = first.shape.first().copied().unwrap_or(1);
    let stride = first.shape.iter().skip(1).product();
    let chunks = ChunkGrid::new(&first.dims, &first.shape, None, &options.chunks)?;
    debug!(variable, path = %first.path.display(), "static variable, loading from first file");

    Ok(LazyArray {
        name: variable.to_string(),
        dims: first.dims,
        shape: first.shape,
        coords,
        attrs: first.attrs,
        chunks,
        plan: AccessPlan {
            variable: variable.to_string(),
            segments: vec![Segment {
                path: first.path,
                range: 0..leading,
                packing: first.packing,
            }],
            stride,
        },
    })
}

fn open_time_series(
    variable: &str,
    paths: &[PathBuf],
    first: FileView,
    mut coords: Vec<Coordinate>,
    options: &GetVarOptions,
) -> Result<LazyArray> {
    let Some(base_time) = &first.time else {
        return Err(Error::InvalidOptions(format!("'{}' has no time axis", variable)));
    };
    let base = base_time.axis.units;

    let mut segments = Vec::new();
    let mut values = Vec::new();
    let mut dates = Vec::new();

    let mut take = |view: &FileView| -> Result<()> {
        let steps = select_steps(view, &base, options)?;
        debug!(
            path = %view.path.display(),
            kept = steps.range.len(),
            "planned file"
        );
        if !steps.range.is_empty() {
            segments.push(Segment {
                path: view.path.clone(),
                range: steps.range,
                packing: view.packing.clone(),
            });
            values.extend(steps.values);
            dates.extend(steps.dates);
        }
        Ok(())
    };

    take(&first)?;
    for path in &paths[1..] {
        let view = {
            let mut reader = open(path)?;
            inspect(path, reader.as_mut(), variable)?
        };
        check_compatible(&first, &view)?;
        take(&view)?;
    }

    if segments.is_empty() {
        return Err(Error::EmptyRange {
            variable: variable.to_string(),
            window: options.window().to_string(),
        });
    }

    let mut shape = first.shape.clone();
    shape[0] = dates.len();
    let stride = shape[1..].iter().product();
    let blocks: Vec<usize> = segments.iter().map(Segment::len).collect();
    let chunks = ChunkGrid::new(&first.dims, &shape, Some(&blocks), &options.chunks)?;

    let mut attrs = first.attrs;
    attrs.insert("calendar".to_string(), base_time.axis.calendar.to_string());
    attrs.insert("time_units".to_string(), base_time.axis.units_attr.clone());

    coords.insert(
        0,
        Coordinate::Time {
            name: base_time.axis.variable.clone(),
            units: base_time.axis.units_attr.clone(),
            calendar: base_time.axis.calendar.to_string(),
            values,
            dates,
        },
    );

    info!(
        variable,
        files = segments.len(),
        steps = shape[0],
        "planned lazy load"
    );

    Ok(LazyArray {
        name: variable.to_string(),
        dims: first.dims,
        shape,
        coords,
        attrs,
        chunks,
        plan: AccessPlan {
            variable: variable.to_string(),
            segments,
            stride,
        },
    })
}
