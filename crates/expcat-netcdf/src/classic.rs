//! Pure-Rust reader for the netCDF classic formats (CDF-1, CDF-2, CDF-5).
//!
//! Only the header is parsed on open. Variable data is read on demand, one
//! contiguous slab along the leading dimension at a time, so scanning a
//! catalog never touches bulk data.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::Path;

use crate::header::{AttrValue, Attribute, Dimension, Format, Header, NcType, Variable};
use crate::{Error, NcReader, Result};

const NC_DIMENSION: u32 = 0x0A;
const NC_VARIABLE: u32 = 0x0B;
const NC_ATTRIBUTE: u32 = 0x0C;
const STREAMING_32: u64 = 0xFFFF_FFFF;
const STREAMING_64: u64 = u64::MAX;

#[derive(Debug, Clone, Copy)]
struct VarLayout {
    begin: u64,
}

/// An open classic-format file: parsed header plus the offsets needed to
/// locate variable data.
pub struct ClassicFile {
    reader: BufReader<File>,
    header: Header,
    layouts: Vec<VarLayout>,
    record_size: u64,
}

impl ClassicFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut parser = HeaderParser::new(&mut reader, file_len);
        let parsed = parser.parse()?;

        let mut classic = ClassicFile {
            reader,
            header: parsed.header,
            layouts: parsed.layouts,
            record_size: 0,
        };
        classic.record_size = classic.compute_record_size()?;
        classic.resolve_record_count(parsed.numrecs, file_len)?;
        classic.check_extents(file_len)?;
        Ok(classic)
    }

    /// Bytes occupied by one record across all record variables. A lone
    /// record variable is stored without inter-record padding.
    fn compute_record_size(&self) -> Result<u64> {
        let record_vars = self
            .header
            .variables
            .iter()
            .filter(|v| self.header.is_record_variable(v))
            .map(|v| self.per_record_bytes(v))
            .collect::<Result<Vec<u64>>>()?;

        match record_vars.as_slice() {
            [] => Ok(0),
            [single] => Ok(*single),
            many => many.iter().try_fold(0u64, |acc, &b| {
                pad4(b)
                    .and_then(|b| acc.checked_add(b))
                    .ok_or_else(|| overflow("record size"))
            }),
        }
    }

    fn per_record_bytes(&self, var: &Variable) -> Result<u64> {
        let shape = self.header.shape(var);
        byte_size(shape.iter().skip(1).copied(), var.nc_type.size())
            .ok_or_else(|| overflow(&format!("record of '{}'", var.name)))
    }

    fn resolve_record_count(&mut self, numrecs: Option<u64>, file_len: u64) -> Result<()> {
        let count = match numrecs {
            Some(n) => n,
            None => {
                let first_record_begin = self
                    .header
                    .variables
                    .iter()
                    .zip(&self.layouts)
                    .filter(|(v, _)| self.header.is_record_variable(v))
                    .map(|(_, l)| l.begin)
                    .min();
                match first_record_begin {
                    Some(begin) if self.record_size > 0 => {
                        file_len.saturating_sub(begin) / self.record_size
                    }
                    _ => 0,
                }
            }
        };

        let count = usize::try_from(count)
            .map_err(|_| Error::Malformed(format!("record count {} too large", count)))?;
        for dim in self.header.dimensions.iter_mut().filter(|d| d.unlimited) {
            dim.len = count;
        }
        Ok(())
    }

    /// Reject headers whose data sections would extend past end of file.
    fn check_extents(&self, file_len: u64) -> Result<()> {
        for (var, layout) in self.header.variables.iter().zip(&self.layouts) {
            let size = if self.header.is_record_variable(var) {
                let records = self.header.shape(var).first().copied().unwrap_or(0) as u64;
                if records == 0 {
                    continue;
                }
                let per_record = self.per_record_bytes(var)?;
                (records - 1)
                    .checked_mul(self.record_size)
                    .and_then(|n| n.checked_add(per_record))
            } else {
                byte_size(self.header.shape(var).into_iter(), var.nc_type.size())
            };
            let end = size
                .and_then(|n| layout.begin.checked_add(n))
                .ok_or_else(|| overflow(&format!("data of '{}'", var.name)))?;
            if end > file_len {
                return Err(Error::Malformed(format!(
                    "data for '{}' ends at byte {} but file has {} bytes",
                    var.name, end, file_len
                )));
            }
        }
        Ok(())
    }

    fn read_exact_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl NcReader for ClassicFile {
    fn header(&self) -> &Header {
        &self.header
    }

    fn read_slab(&mut self, variable: &str, range: Range<usize>) -> Result<Vec<f64>> {
        let idx = self
            .header
            .variables
            .iter()
            .position(|v| v.name == variable)
            .ok_or_else(|| Error::MissingVariable(variable.to_string()))?;
        let var = self.header.variables[idx].clone();
        if var.nc_type == NcType::Char {
            return Err(Error::NotNumeric(variable.to_string()));
        }
        let begin = self.layouts[idx].begin;
        let shape = self.header.shape(&var);
        let elem = var.nc_type.size();

        if shape.is_empty() {
            let bytes = self.read_exact_at(begin, elem)?;
            return decode(&var, &bytes);
        }

        let extent = shape[0];
        if range.start > range.end || range.end > extent {
            return Err(Error::OutOfBounds {
                variable: variable.to_string(),
                requested: range,
                extent,
            });
        }

        let slab_overflow = || overflow(&format!("slab of '{}'", variable));
        let slab_bytes = byte_size(shape.iter().skip(1).copied(), elem)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(slab_overflow)?;

        if self.header.is_record_variable(&var) && self.record_size != slab_bytes as u64 {
            let mut values = Vec::new();
            for record in range {
                let offset = (record as u64)
                    .checked_mul(self.record_size)
                    .and_then(|n| begin.checked_add(n))
                    .ok_or_else(slab_overflow)?;
                let bytes = self.read_exact_at(offset, slab_bytes)?;
                values.extend(decode(&var, &bytes)?);
            }
            return Ok(values);
        }

        let offset = (range.start as u64)
            .checked_mul(slab_bytes as u64)
            .and_then(|n| begin.checked_add(n))
            .ok_or_else(slab_overflow)?;
        let len = range.len().checked_mul(slab_bytes).ok_or_else(slab_overflow)?;
        let bytes = self.read_exact_at(offset, len)?;
        decode(&var, &bytes)
    }
}

fn decode(var: &Variable, bytes: &[u8]) -> Result<Vec<f64>> {
    var.nc_type
        .decode(bytes)
        .ok_or_else(|| Error::NotNumeric(var.name.clone()))
}

fn pad4(n: u64) -> Option<u64> {
    n.checked_add(3).map(|n| n & !3)
}

/// `elem` times the product of `dims`, or `None` on overflow.
fn byte_size(dims: impl Iterator<Item = usize>, elem: usize) -> Option<u64> {
    dims.map(|n| n as u64)
        .try_fold(elem as u64, |acc, n| acc.checked_mul(n))
}

fn overflow(what: &str) -> Error {
    Error::Malformed(format!("{} overflows the addressable size", what))
}

struct ParsedHeader {
    header: Header,
    layouts: Vec<VarLayout>,
    /// `None` when the file was written in streaming mode.
    numrecs: Option<u64>,
}

struct HeaderParser<'a, R: Read> {
    reader: &'a mut R,
    file_len: u64,
    version: u8,
}

impl<'a, R: Read> HeaderParser<'a, R> {
    fn new(reader: &'a mut R, file_len: u64) -> Self {
        Self {
            reader,
            file_len,
            version: 0,
        }
    }

    fn parse(&mut self) -> Result<ParsedHeader> {
        let mut magic = [0u8; 4];
        self.reader
            .read_exact(&mut magic)
            .map_err(|_| Error::NotNetcdf("file shorter than magic number".to_string()))?;
        if &magic[..3] != b"CDF" {
            return Err(Error::NotNetcdf(format!("bad magic {:?}", magic)));
        }
        self.version = magic[3];
        let format = match self.version {
            1 => Format::Classic,
            2 => Format::Offset64,
            5 => Format::Data64,
            v => return Err(Error::UnsupportedFormat(format!("CDF version {}", v))),
        };

        let raw_numrecs = self.non_neg()?;
        let streaming = if self.version == 5 {
            STREAMING_64
        } else {
            STREAMING_32
        };
        let numrecs = (raw_numrecs != streaming).then_some(raw_numrecs);

        let dimensions = self.dimensions(numrecs.unwrap_or(0))?;
        let attributes = self.attributes()?;
        let (variables, layouts) = self.variables(&dimensions)?;

        Ok(ParsedHeader {
            header: Header {
                format,
                dimensions,
                attributes,
                variables,
            },
            layouts,
            numrecs,
        })
    }

    fn u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.reader.read_exact(&mut buf).map_err(truncated)?;
        Ok(u32::from_be_bytes(buf))
    }

    fn u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.reader.read_exact(&mut buf).map_err(truncated)?;
        Ok(u64::from_be_bytes(buf))
    }

    /// Counts and lengths: 32-bit except in CDF-5.
    fn non_neg(&mut self) -> Result<u64> {
        if self.version == 5 {
            self.u64()
        } else {
            self.u32().map(u64::from)
        }
    }

    /// Data offsets: 32-bit only in CDF-1.
    fn offset(&mut self) -> Result<u64> {
        if self.version == 1 {
            self.u32().map(u64::from)
        } else {
            self.u64()
        }
    }

    fn bounded(&self, count: u64, unit: u64, what: &str) -> Result<usize> {
        if count.saturating_mul(unit) > self.file_len {
            return Err(Error::Malformed(format!(
                "{} count {} exceeds file size",
                what, count
            )));
        }
        Ok(count as usize)
    }

    fn bytes_padded(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf).map_err(truncated)?;
        let pad = (4 - len % 4) % 4;
        let mut skip = [0u8; 3];
        self.reader.read_exact(&mut skip[..pad]).map_err(truncated)?;
        Ok(buf)
    }

    fn name(&mut self) -> Result<String> {
        let len = self.non_neg()?;
        let len = self.bounded(len, 1, "name length")?;
        let bytes = self.bytes_padded(len)?;
        String::from_utf8(bytes).map_err(|_| Error::Malformed("name is not UTF-8".to_string()))
    }

    /// Returns the element count of a tagged list, or 0 for ABSENT.
    fn list_header(&mut self, expected_tag: u32, what: &str) -> Result<u64> {
        let tag = self.u32()?;
        let count = self.non_neg()?;
        match tag {
            0 if count == 0 => Ok(0),
            t if t == expected_tag => Ok(count),
            t => Err(Error::Malformed(format!(
                "expected {} list, found tag {:#x}",
                what, t
            ))),
        }
    }

    fn dimensions(&mut self, numrecs: u64) -> Result<Vec<Dimension>> {
        let count = self.list_header(NC_DIMENSION, "dimension")?;
        let count = self.bounded(count, 8, "dimension")?;
        let mut dims = Vec::with_capacity(count);
        for _ in 0..count {
            let name = self.name()?;
            let len = self.non_neg()?;
            let unlimited = len == 0;
            let len = if unlimited { numrecs } else { len };
            dims.push(Dimension {
                name,
                len: usize::try_from(len)
                    .map_err(|_| Error::Malformed("dimension too large".to_string()))?,
                unlimited,
            });
        }
        if dims.iter().filter(|d| d.unlimited).count() > 1 {
            return Err(Error::Malformed(
                "more than one unlimited dimension".to_string(),
            ));
        }
        Ok(dims)
    }

    fn attributes(&mut self) -> Result<Vec<Attribute>> {
        let count = self.list_header(NC_ATTRIBUTE, "attribute")?;
        let count = self.bounded(count, 12, "attribute")?;
        let mut attrs = Vec::with_capacity(count);
        for _ in 0..count {
            let name = self.name()?;
            let code = self.u32()?;
            let nc_type = NcType::from_code(code)
                .ok_or_else(|| Error::Malformed(format!("attribute type {}", code)))?;
            let nelems = self.non_neg()?;
            let nelems = self.bounded(nelems, nc_type.size() as u64, "attribute value")?;
            let bytes = self.bytes_padded(nelems * nc_type.size())?;
            let value = match nc_type {
                NcType::Char => {
                    let text = String::from_utf8_lossy(&bytes);
                    AttrValue::Text(text.trim_end_matches('\0').to_string())
                }
                ty => AttrValue::Numbers(
                    ty,
                    ty.decode(&bytes)
                        .ok_or_else(|| Error::Malformed("attribute values".to_string()))?,
                ),
            };
            attrs.push(Attribute { name, value });
        }
        Ok(attrs)
    }

    fn variables(&mut self, dims: &[Dimension]) -> Result<(Vec<Variable>, Vec<VarLayout>)> {
        let count = self.list_header(NC_VARIABLE, "variable")?;
        let count = self.bounded(count, 16, "variable")?;
        let mut vars = Vec::with_capacity(count);
        let mut layouts = Vec::with_capacity(count);
        for _ in 0..count {
            let name = self.name()?;
            let ndims = self.non_neg()?;
            let ndims = self.bounded(ndims, 4, "dimension id")?;
            let mut dimensions = Vec::with_capacity(ndims);
            for _ in 0..ndims {
                let id = self.non_neg()? as usize;
                if id >= dims.len() {
                    return Err(Error::Malformed(format!(
                        "variable '{}' references dimension {}",
                        name, id
                    )));
                }
                dimensions.push(id);
            }
            if dimensions.iter().skip(1).any(|&id| dims[id].unlimited) {
                return Err(Error::Malformed(format!(
                    "variable '{}' uses the record dimension in a non-leading position",
                    name
                )));
            }
            let attributes = self.attributes()?;
            let code = self.u32()?;
            let nc_type = NcType::from_code(code)
                .ok_or_else(|| Error::Malformed(format!("variable type {}", code)))?;
            let _vsize = self.non_neg()?;
            let begin = self.offset()?;
            vars.push(Variable {
                name,
                dimensions,
                attributes,
                nc_type,
            });
            layouts.push(VarLayout { begin });
        }
        Ok((vars, layouts))
    }
}

fn truncated(_: std::io::Error) -> Error {
    Error::Malformed("header truncated".to_string())
}
