use std::collections::BTreeMap;
use std::path::Path;

use expcat_types::CalendarDate;
use ndarray::{ArrayD, IxDyn, Slice};
use serde::Serialize;

use crate::chunks::ChunkGrid;
use crate::plan::AccessPlan;
use crate::Result;

/// Labels along one dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Coordinate {
    /// Concatenated time axis. `values` are in the first file's units with
    /// any offset applied; `dates` are their decoded calendar dates.
    Time {
        name: String,
        units: String,
        calendar: String,
        values: Vec<f64>,
        dates: Vec<CalendarDate>,
    },
    /// 1-D coordinate variable read from the first file.
    Values {
        name: String,
        units: Option<String>,
        values: Vec<f64>,
    },
}

impl Coordinate {
    pub fn name(&self) -> &str {
        match self {
            Coordinate::Time { name, .. } | Coordinate::Values { name, .. } => name,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Coordinate::Time { values, .. } | Coordinate::Values { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A dimension-labelled array whose data has not been read yet.
///
/// Cloning is cheap relative to the data and the value is `Send + Sync`;
/// each `force` opens the files it needs and closes them before returning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LazyArray {
    pub name: String,
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    pub coords: Vec<Coordinate>,
    pub attrs: BTreeMap<String, String>,
    pub chunks: ChunkGrid,
    pub plan: AccessPlan,
}

impl LazyArray {
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Number of elements.
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn coord(&self, name: &str) -> Option<&Coordinate> {
        self.coords.iter().find(|c| c.name() == name)
    }

    /// Decoded time axis, if the variable has one.
    pub fn time(&self) -> Option<&[CalendarDate]> {
        self.coords.iter().find_map(|c| match c {
            Coordinate::Time { dates, .. } => Some(dates.as_slice()),
            Coordinate::Values { .. } => None,
        })
    }

    pub fn files(&self) -> Vec<&Path> {
        self.plan.files()
    }

    /// Read every segment and assemble the full array.
    pub fn force(&self) -> Result<DataArray> {
        let values = self.plan.read(0..self.plan.len())?;
        let data = ArrayD::from_shape_vec(IxDyn(&self.shape), values)?;
        Ok(DataArray {
            name: self.name.clone(),
            dims: self.dims.clone(),
            coords: self.coords.clone(),
            attrs: self.attrs.clone(),
            data,
        })
    }

    /// Read one block of the chunk grid. Only the files overlapping the
    /// block's leading range are opened.
    pub fn force_chunk(&self, index: &[usize]) -> Result<ArrayD<f64>> {
        let ranges = self.chunks.ranges(index)?;
        let Some(leading) = ranges.first().cloned() else {
            return Ok(self.force()?.data);
        };

        let values = self.plan.read(leading.clone())?;
        let mut slab_shape = self.shape.clone();
        slab_shape[0] = leading.len();
        let slab = ArrayD::from_shape_vec(IxDyn(&slab_shape), values)?;

        let block = slab
            .slice_each_axis(|ax| match ax.axis.index() {
                0 => Slice::from(..),
                axis => Slice::from(ranges[axis].clone()),
            })
            .to_owned();
        Ok(block)
    }
}

/// A materialised array with its labels.
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    pub name: String,
    pub dims: Vec<String>,
    pub coords: Vec<Coordinate>,
    pub attrs: BTreeMap<String, String>,
    pub data: ArrayD<f64>,
}

impl DataArray {
    pub fn time(&self) -> Option<&[CalendarDate]> {
        self.coords.iter().find_map(|c| match c {
            Coordinate::Time { dates, .. } => Some(dates.as_slice()),
            Coordinate::Values { .. } => None,
        })
    }

    /// Minimum, maximum and mean over non-NaN elements.
    pub fn stats(&self) -> Option<Stats> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in self.data.iter().filter(|v| !v.is_nan()) {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        (count > 0).then(|| Stats {
            count,
            missing: self.data.len() - count,
            min,
            max,
            mean: sum / count as f64,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    pub count: usize,
    pub missing: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}
