//! Format-independent view of a netCDF header.

use crate::{Error, Result};

/// On-disk flavour of a netCDF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// CDF-1, 32-bit offsets
    Classic,
    /// CDF-2, 64-bit offsets
    Offset64,
    /// CDF-5, 64-bit data
    Data64,
    /// netCDF-4 (HDF5 container)
    Netcdf4,
}

/// External data types of the classic model (CDF-5 adds the unsigned and
/// 64-bit integer types).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NcType {
    Byte,
    Char,
    Short,
    Int,
    Float,
    Double,
    UByte,
    UShort,
    UInt,
    Int64,
    UInt64,
}

impl NcType {
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => NcType::Byte,
            2 => NcType::Char,
            3 => NcType::Short,
            4 => NcType::Int,
            5 => NcType::Float,
            6 => NcType::Double,
            7 => NcType::UByte,
            8 => NcType::UShort,
            9 => NcType::UInt,
            10 => NcType::Int64,
            11 => NcType::UInt64,
            _ => return None,
        })
    }

    pub fn code(&self) -> u32 {
        match self {
            NcType::Byte => 1,
            NcType::Char => 2,
            NcType::Short => 3,
            NcType::Int => 4,
            NcType::Float => 5,
            NcType::Double => 6,
            NcType::UByte => 7,
            NcType::UShort => 8,
            NcType::UInt => 9,
            NcType::Int64 => 10,
            NcType::UInt64 => 11,
        }
    }

    /// Size in bytes of one element.
    pub fn size(&self) -> usize {
        match self {
            NcType::Byte | NcType::Char | NcType::UByte => 1,
            NcType::Short | NcType::UShort => 2,
            NcType::Int | NcType::UInt | NcType::Float => 4,
            NcType::Double | NcType::Int64 | NcType::UInt64 => 8,
        }
    }

    /// Decode big-endian elements into `f64`.
    pub fn decode(&self, bytes: &[u8]) -> Option<Vec<f64>> {
        let size = self.size();
        let chunks = bytes.chunks_exact(size);
        let values = match self {
            NcType::Char => return None,
            NcType::Byte => chunks.map(|b| i8::from_be_bytes([b[0]]) as f64).collect(),
            NcType::UByte => chunks.map(|b| b[0] as f64).collect(),
            NcType::Short => chunks
                .map(|b| i16::from_be_bytes([b[0], b[1]]) as f64)
                .collect(),
            NcType::UShort => chunks
                .map(|b| u16::from_be_bytes([b[0], b[1]]) as f64)
                .collect(),
            NcType::Int => chunks
                .map(|b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f64)
                .collect(),
            NcType::UInt => chunks
                .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f64)
                .collect(),
            NcType::Float => chunks
                .map(|b| f32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f64)
                .collect(),
            NcType::Double => chunks.map(|b| f64::from_be_bytes(eight(b))).collect(),
            NcType::Int64 => chunks.map(|b| i64::from_be_bytes(eight(b)) as f64).collect(),
            NcType::UInt64 => chunks.map(|b| u64::from_be_bytes(eight(b)) as f64).collect(),
        };
        Some(values)
    }

    /// Encode `f64` values as big-endian elements of this type.
    pub fn encode(&self, values: &[f64], out: &mut Vec<u8>) {
        for &v in values {
            match self {
                NcType::Byte | NcType::Char => out.push(v as i8 as u8),
                NcType::UByte => out.push(v as u8),
                NcType::Short => out.extend_from_slice(&(v as i16).to_be_bytes()),
                NcType::UShort => out.extend_from_slice(&(v as u16).to_be_bytes()),
                NcType::Int => out.extend_from_slice(&(v as i32).to_be_bytes()),
                NcType::UInt => out.extend_from_slice(&(v as u32).to_be_bytes()),
                NcType::Float => out.extend_from_slice(&(v as f32).to_be_bytes()),
                NcType::Double => out.extend_from_slice(&v.to_be_bytes()),
                NcType::Int64 => out.extend_from_slice(&(v as i64).to_be_bytes()),
                NcType::UInt64 => out.extend_from_slice(&(v as u64).to_be_bytes()),
            }
        }
    }
}

fn eight(b: &[u8]) -> [u8; 8] {
    [b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Numbers(NcType, Vec<f64>),
}

impl AttrValue {
    pub fn text(s: impl Into<String>) -> Self {
        AttrValue::Text(s.into())
    }

    pub fn double(v: f64) -> Self {
        AttrValue::Numbers(NcType::Double, vec![v])
    }

    pub fn doubles(values: Vec<f64>) -> Self {
        AttrValue::Numbers(NcType::Double, values)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s.as_str()),
            AttrValue::Numbers(..) => None,
        }
    }

    /// First numeric element.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Numbers(_, values) => values.first().copied(),
            AttrValue::Text(_) => None,
        }
    }

    pub fn as_numbers(&self) -> Option<&[f64]> {
        match self {
            AttrValue::Numbers(_, values) => Some(values),
            AttrValue::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttrValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    /// Current length; for the record dimension this is the record count.
    pub len: usize,
    pub unlimited: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    /// Indices into [`Header::dimensions`].
    pub dimensions: Vec<usize>,
    pub attributes: Vec<Attribute>,
    pub nc_type: NcType,
}

impl Variable {
    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.value)
    }

    pub fn text_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(AttrValue::as_text)
    }

    pub fn number_attribute(&self, name: &str) -> Option<f64> {
        self.attribute(name).and_then(AttrValue::as_f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub format: Format,
    pub dimensions: Vec<Dimension>,
    pub attributes: Vec<Attribute>,
    pub variables: Vec<Variable>,
}

impl Header {
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn require_variable(&self, name: &str) -> Result<&Variable> {
        self.variable(name)
            .ok_or_else(|| Error::MissingVariable(name.to_string()))
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn dimension_names(&self, var: &Variable) -> Vec<String> {
        var.dimensions
            .iter()
            .filter_map(|&id| self.dimensions.get(id))
            .map(|d| d.name.clone())
            .collect()
    }

    pub fn shape(&self, var: &Variable) -> Vec<usize> {
        var.dimensions
            .iter()
            .filter_map(|&id| self.dimensions.get(id))
            .map(|d| d.len)
            .collect()
    }

    /// Whether the variable's leading dimension is the unlimited one.
    pub fn is_record_variable(&self, var: &Variable) -> bool {
        var.dimensions
            .first()
            .and_then(|&id| self.dimensions.get(id))
            .is_some_and(|d| d.unlimited)
    }

    /// A 1-D variable named after its own dimension.
    pub fn is_coordinate_variable(&self, var: &Variable) -> bool {
        var.dimensions.len() == 1
            && self
                .dimensions
                .get(var.dimensions[0])
                .is_some_and(|d| d.name == var.name)
    }

    pub fn global_text_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value.as_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes_roundtrip() {
        for code in 1..=11 {
            let ty = NcType::from_code(code).unwrap();
            assert_eq!(ty.code(), code);
        }
        assert!(NcType::from_code(0).is_none());
        assert!(NcType::from_code(12).is_none());
    }

    #[test]
    fn test_encode_decode_short() {
        let mut buf = Vec::new();
        NcType::Short.encode(&[-2.0, 300.0], &mut buf);
        assert_eq!(buf, vec![0xff, 0xfe, 0x01, 0x2c]);
        assert_eq!(NcType::Short.decode(&buf).unwrap(), vec![-2.0, 300.0]);
        assert!(NcType::Char.decode(&buf).is_none());
    }
}
