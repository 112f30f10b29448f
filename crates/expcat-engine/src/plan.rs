//! Access plans: which slab of which file backs each part of a lazy array.

use std::ops::Range;
use std::path::{Path, PathBuf};

use expcat_netcdf::Variable;
use serde::Serialize;
use tracing::debug;

use crate::{Error, Result};

/// CF packing and missing-value conventions of one file's variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Packing {
    pub scale_factor: f64,
    pub add_offset: f64,
    /// `_FillValue` and `missing_value`, compared against packed values.
    pub fill_values: Vec<f64>,
}

impl Default for Packing {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            add_offset: 0.0,
            fill_values: Vec::new(),
        }
    }
}

impl Packing {
    pub fn from_variable(var: &Variable) -> Self {
        let fill_values = ["_FillValue", "missing_value"]
            .iter()
            .filter_map(|name| var.attribute(name))
            .filter_map(|value| value.as_numbers())
            .flatten()
            .copied()
            .collect();
        Self {
            scale_factor: var.number_attribute("scale_factor").unwrap_or(1.0),
            add_offset: var.number_attribute("add_offset").unwrap_or(0.0),
            fill_values,
        }
    }

    /// Unpack raw values in place; fill values become NaN.
    pub fn apply(&self, values: &mut [f64]) {
        let identity = self.scale_factor == 1.0 && self.add_offset == 0.0;
        for v in values.iter_mut() {
            if self.fill_values.iter().any(|f| f == v) {
                *v = f64::NAN;
            } else if !identity {
                *v = *v * self.scale_factor + self.add_offset;
            }
        }
    }
}

/// A contiguous leading-dimension slab of one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub path: PathBuf,
    /// Leading-dimension indices within the file.
    pub range: Range<usize>,
    pub packing: Packing,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Open the file, read `local` (file indices) and close it again.
    fn read(&self, variable: &str, local: Range<usize>) -> Result<Vec<f64>> {
        debug!(path = %self.path.display(), variable, range = ?local, "reading slab");
        let mut reader = expcat_netcdf::open(&self.path).map_err(Error::netcdf(&self.path))?;
        let mut values = reader
            .read_slab(variable, local)
            .map_err(Error::netcdf(&self.path))?;
        self.packing.apply(&mut values);
        Ok(values)
    }
}

/// Ordered segments concatenated along the leading dimension.
///
/// The plan only holds paths; nothing stays open between reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessPlan {
    pub variable: String,
    pub segments: Vec<Segment>,
    /// Elements per leading-dimension index.
    pub stride: usize,
}

impl AccessPlan {
    /// Total leading extent.
    pub fn len(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct files in plan order.
    pub fn files(&self) -> Vec<&Path> {
        let mut files: Vec<&Path> = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            if files.last() != Some(&segment.path.as_path()) {
                files.push(&segment.path);
            }
        }
        files
    }

    /// Values for global leading indices `range`, in row-major order.
    pub fn read(&self, range: Range<usize>) -> Result<Vec<f64>> {
        let extent = self.len();
        if range.start > range.end || range.end > extent {
            return Err(Error::SlabOutOfRange {
                requested: range,
                extent,
            });
        }

        let mut out = Vec::with_capacity(range.len() * self.stride);
        let mut start = 0;
        for segment in &self.segments {
            if start >= range.end {
                break;
            }
            let end = start + segment.len();
            let lo = range.start.max(start);
            let hi = range.end.min(end);
            if lo < hi {
                let local = segment.range.start + (lo - start)..segment.range.start + (hi - start);
                out.extend(segment.read(&self.variable, local)?);
            }
            start = end;
        }
        Ok(out)
    }
}
