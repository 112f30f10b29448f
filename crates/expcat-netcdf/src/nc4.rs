//! netCDF-4 (HDF5) access through the system netCDF library.

use std::ops::Range;
use std::path::Path;

use netcdf::AttributeValue;

use crate::header::{AttrValue, Attribute, Dimension, Format, Header, NcType, Variable};
use crate::{Error, NcReader, Result};

pub struct Nc4File {
    file: netcdf::File,
    header: Header,
}

impl Nc4File {
    pub fn open(path: &Path) -> Result<Self> {
        let file = netcdf::open(path)
            .map_err(|e| Error::Malformed(format!("netCDF-4 open failed: {}", e)))?;

        let dimensions: Vec<Dimension> = file
            .dimensions()
            .map(|d| Dimension {
                name: d.name(),
                len: d.len(),
                unlimited: d.is_unlimited(),
            })
            .collect();

        let attributes = file.attributes().filter_map(convert_attribute).collect();

        let mut variables = Vec::new();
        for var in file.variables() {
            let ids = var
                .dimensions()
                .iter()
                .filter_map(|d| dimensions.iter().position(|known| known.name == d.name()))
                .collect();
            let attributes = var.attributes().filter_map(convert_attribute).collect();
            variables.push(Variable {
                name: var.name(),
                dimensions: ids,
                attributes,
                // Values are always read back as f64.
                nc_type: NcType::Double,
            });
        }

        tracing::debug!(path = %path.display(), variables = variables.len(), "opened netCDF-4 file");

        Ok(Self {
            file,
            header: Header {
                format: Format::Netcdf4,
                dimensions,
                attributes,
                variables,
            },
        })
    }
}

fn convert_attribute(attr: netcdf::Attribute<'_>) -> Option<Attribute> {
    let name = attr.name().to_string();
    let value = match attr.value().ok()? {
        AttributeValue::Str(s) => AttrValue::Text(s),
        AttributeValue::Doubles(v) => AttrValue::doubles(v),
        AttributeValue::Floats(v) => AttrValue::doubles(v.into_iter().map(f64::from).collect()),
        other => AttrValue::double(f64::try_from(other).ok()?),
    };
    Some(Attribute { name, value })
}

impl NcReader for Nc4File {
    fn header(&self) -> &Header {
        &self.header
    }

    fn read_slab(&mut self, variable: &str, range: Range<usize>) -> Result<Vec<f64>> {
        let var = self.header.require_variable(variable)?;
        let shape = self.header.shape(var);
        let nc_var = self
            .file
            .variable(variable)
            .ok_or_else(|| Error::MissingVariable(variable.to_string()))?;

        if shape.is_empty() {
            return nc_var
                .get_values::<f64, _>(..)
                .map_err(|e| Error::Malformed(e.to_string()));
        }
        if range.start > range.end || range.end > shape[0] {
            return Err(Error::OutOfBounds {
                variable: variable.to_string(),
                requested: range,
                extent: shape[0],
            });
        }

        let mut start = vec![0usize; shape.len()];
        let mut count = shape.clone();
        start[0] = range.start;
        count[0] = range.len();
        nc_var
            .get_values::<f64, _>((start.as_slice(), count.as_slice()))
            .map_err(|e| Error::Malformed(e.to_string()))
    }
}
