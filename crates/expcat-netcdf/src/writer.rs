//! Writer for the netCDF classic formats.
//!
//! Covers what the catalog needs to produce files of its own (fixtures,
//! exports): fixed and record dimensions, global and per-variable
//! attributes, numeric and text variables held fully in memory.

use std::path::Path;

use crate::header::{AttrValue, Attribute, Dimension, NcType, Variable};
use crate::{Error, Result};

const NC_DIMENSION: u32 = 0x0A;
const NC_VARIABLE: u32 = 0x0B;
const NC_ATTRIBUTE: u32 = 0x0C;

struct PendingVariable {
    var: Variable,
    data: Vec<f64>,
}

/// Incrementally describes a file and serializes it in one pass.
pub struct FileBuilder {
    offset64: bool,
    dimensions: Vec<Dimension>,
    attributes: Vec<Attribute>,
    variables: Vec<PendingVariable>,
}

impl Default for FileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FileBuilder {
    /// CDF-1 output.
    pub fn new() -> Self {
        Self {
            offset64: false,
            dimensions: Vec::new(),
            attributes: Vec::new(),
            variables: Vec::new(),
        }
    }

    /// Switch to CDF-2 (64-bit offsets).
    pub fn offset64(&mut self) -> &mut Self {
        self.offset64 = true;
        self
    }

    pub fn dimension(&mut self, name: &str, len: usize) -> &mut Self {
        self.dimensions.push(Dimension {
            name: name.to_string(),
            len,
            unlimited: false,
        });
        self
    }

    /// The record dimension, holding `records` records.
    pub fn unlimited_dimension(&mut self, name: &str, records: usize) -> &mut Self {
        self.dimensions.push(Dimension {
            name: name.to_string(),
            len: records,
            unlimited: true,
        });
        self
    }

    pub fn global_attribute(&mut self, name: &str, value: AttrValue) -> &mut Self {
        self.attributes.push(Attribute {
            name: name.to_string(),
            value,
        });
        self
    }

    pub fn add_variable(
        &mut self,
        name: &str,
        nc_type: NcType,
        dims: &[&str],
        data: Vec<f64>,
    ) -> Result<&mut Self> {
        if self.variables.iter().any(|p| p.var.name == name) {
            return Err(Error::Write(format!("variable '{}' defined twice", name)));
        }
        let mut ids = Vec::with_capacity(dims.len());
        for dim in dims {
            let id = self
                .dimensions
                .iter()
                .position(|d| d.name == *dim)
                .ok_or_else(|| Error::Write(format!("unknown dimension '{}'", dim)))?;
            if !ids.is_empty() && self.dimensions[id].unlimited {
                return Err(Error::Write(format!(
                    "record dimension '{}' must lead in '{}'",
                    dim, name
                )));
            }
            ids.push(id);
        }
        let expected: usize = ids.iter().map(|&id| self.dimensions[id].len).product();
        if data.len() != expected {
            return Err(Error::Write(format!(
                "variable '{}' expects {} values, got {}",
                name,
                expected,
                data.len()
            )));
        }
        self.variables.push(PendingVariable {
            var: Variable {
                name: name.to_string(),
                dimensions: ids,
                attributes: Vec::new(),
                nc_type,
            },
            data,
        });
        Ok(self)
    }

    /// A CHAR variable holding `text`, padded with NULs to the dimension length.
    pub fn add_text_variable(&mut self, name: &str, dim: &str, text: &str) -> Result<&mut Self> {
        let len = self
            .dimensions
            .iter()
            .find(|d| d.name == dim)
            .map(|d| d.len)
            .ok_or_else(|| Error::Write(format!("unknown dimension '{}'", dim)))?;
        let mut bytes: Vec<f64> = text.bytes().take(len).map(f64::from).collect();
        bytes.resize(len, 0.0);
        self.add_variable(name, NcType::Char, &[dim], bytes)
    }

    pub fn add_variable_attribute(
        &mut self,
        variable: &str,
        name: &str,
        value: AttrValue,
    ) -> Result<&mut Self> {
        let pending = self
            .variables
            .iter_mut()
            .find(|p| p.var.name == variable)
            .ok_or_else(|| Error::Write(format!("unknown variable '{}'", variable)))?;
        pending.var.attributes.push(Attribute {
            name: name.to_string(),
            value,
        });
        Ok(self)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let numrecs = self
            .dimensions
            .iter()
            .find(|d| d.unlimited)
            .map(|d| d.len)
            .unwrap_or(0);

        // Offsets are fixed-width, so a first pass with zero offsets gives
        // the final header length.
        let placeholder = vec![0u64; self.variables.len()];
        let header_len = self.encode_header(numrecs, &placeholder)?.len() as u64;

        let mut begins = vec![0u64; self.variables.len()];
        let mut cursor = header_len;
        for (i, pending) in self.variables.iter().enumerate() {
            if !self.is_record(&pending.var) {
                begins[i] = cursor;
                cursor += pad4(self.fixed_bytes(&pending.var));
            }
        }
        let record_vars: Vec<usize> = (0..self.variables.len())
            .filter(|&i| self.is_record(&self.variables[i].var))
            .collect();
        let lone_record = record_vars.len() == 1;
        for &i in &record_vars {
            begins[i] = cursor;
            let per_record = self.per_record_bytes(&self.variables[i].var);
            cursor += if lone_record { per_record } else { pad4(per_record) };
        }

        let mut out = self.encode_header(numrecs, &begins)?;
        for pending in self.variables.iter().filter(|p| !self.is_record(&p.var)) {
            pending.var.nc_type.encode(&pending.data, &mut out);
            pad_to4(&mut out);
        }
        for record in 0..numrecs {
            for &i in &record_vars {
                let pending = &self.variables[i];
                let inner = self.inner_len(&pending.var);
                let slab = &pending.data[record * inner..(record + 1) * inner];
                pending.var.nc_type.encode(slab, &mut out);
                if !lone_record {
                    pad_to4(&mut out);
                }
            }
        }
        Ok(out)
    }

    fn is_record(&self, var: &Variable) -> bool {
        var.dimensions
            .first()
            .is_some_and(|&id| self.dimensions[id].unlimited)
    }

    fn inner_len(&self, var: &Variable) -> usize {
        var.dimensions
            .iter()
            .skip(1)
            .map(|&id| self.dimensions[id].len)
            .product()
    }

    fn fixed_bytes(&self, var: &Variable) -> u64 {
        let elems: usize = var
            .dimensions
            .iter()
            .map(|&id| self.dimensions[id].len)
            .product();
        (elems * var.nc_type.size()) as u64
    }

    fn per_record_bytes(&self, var: &Variable) -> u64 {
        (self.inner_len(var) * var.nc_type.size()) as u64
    }

    fn encode_header(&self, numrecs: usize, begins: &[u64]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(b"CDF");
        out.push(if self.offset64 { 2 } else { 1 });
        put_u32(&mut out, numrecs as u64)?;

        if self.dimensions.is_empty() {
            out.extend_from_slice(&[0; 8]);
        } else {
            put_u32(&mut out, NC_DIMENSION as u64)?;
            put_u32(&mut out, self.dimensions.len() as u64)?;
            for dim in &self.dimensions {
                put_name(&mut out, &dim.name)?;
                put_u32(&mut out, if dim.unlimited { 0 } else { dim.len as u64 })?;
            }
        }

        put_attributes(&mut out, &self.attributes)?;

        if self.variables.is_empty() {
            out.extend_from_slice(&[0; 8]);
        } else {
            put_u32(&mut out, NC_VARIABLE as u64)?;
            put_u32(&mut out, self.variables.len() as u64)?;
            for (pending, &begin) in self.variables.iter().zip(begins) {
                let var = &pending.var;
                put_name(&mut out, &var.name)?;
                put_u32(&mut out, var.dimensions.len() as u64)?;
                for &id in &var.dimensions {
                    put_u32(&mut out, id as u64)?;
                }
                put_attributes(&mut out, &var.attributes)?;
                put_u32(&mut out, var.nc_type.code() as u64)?;
                let vsize = if self.is_record(var) {
                    pad4(self.per_record_bytes(var))
                } else {
                    pad4(self.fixed_bytes(var))
                };
                put_u32(&mut out, vsize.min(u32::MAX as u64))?;
                if self.offset64 {
                    out.extend_from_slice(&begin.to_be_bytes());
                } else {
                    put_u32(&mut out, begin).map_err(|_| {
                        Error::Write("file too large for 32-bit offsets".to_string())
                    })?;
                }
            }
        }
        Ok(out)
    }
}

fn put_u32(out: &mut Vec<u8>, value: u64) -> Result<()> {
    let value = u32::try_from(value)
        .map_err(|_| Error::Write(format!("{} does not fit in 32 bits", value)))?;
    out.extend_from_slice(&value.to_be_bytes());
    Ok(())
}

fn put_name(out: &mut Vec<u8>, name: &str) -> Result<()> {
    put_u32(out, name.len() as u64)?;
    out.extend_from_slice(name.as_bytes());
    pad_to4(out);
    Ok(())
}

fn put_attributes(out: &mut Vec<u8>, attrs: &[Attribute]) -> Result<()> {
    if attrs.is_empty() {
        out.extend_from_slice(&[0; 8]);
        return Ok(());
    }
    put_u32(out, NC_ATTRIBUTE as u64)?;
    put_u32(out, attrs.len() as u64)?;
    for attr in attrs {
        put_name(out, &attr.name)?;
        match &attr.value {
            AttrValue::Text(text) => {
                put_u32(out, NcType::Char.code() as u64)?;
                put_u32(out, text.len() as u64)?;
                out.extend_from_slice(text.as_bytes());
            }
            AttrValue::Numbers(ty, values) => {
                put_u32(out, ty.code() as u64)?;
                put_u32(out, values.len() as u64)?;
                ty.encode(values, out);
            }
        }
        pad_to4(out);
    }
    Ok(())
}

fn pad4(n: u64) -> u64 {
    (n + 3) & !3
}

fn pad_to4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_length_mismatch() {
        let mut builder = FileBuilder::new();
        builder.dimension("x", 3);
        let err = builder
            .add_variable("v", NcType::Float, &["x"], vec![1.0, 2.0])
            .err()
            .unwrap();
        assert!(err.to_string().contains("expects 3 values"));
    }

    #[test]
    fn test_rejects_trailing_record_dimension() {
        let mut builder = FileBuilder::new();
        builder.dimension("x", 1).unlimited_dimension("time", 1);
        assert!(
            builder
                .add_variable("v", NcType::Float, &["x", "time"], vec![0.0])
                .is_err()
        );
    }

    #[test]
    fn test_empty_file_header() {
        let bytes = FileBuilder::new().to_bytes().unwrap();
        assert_eq!(&bytes[..4], b"CDF\x01");
        assert_eq!(bytes.len(), 4 + 4 + 8 * 3);
    }
}
