// netCDF access for expcat
// Header-first: opening a file parses metadata only, data is read by slab

mod classic;
mod error;
mod header;
#[cfg(feature = "netcdf4")]
mod nc4;
mod writer;

use std::fs::File;
use std::io::Read;
use std::ops::Range;
use std::path::Path;

pub use classic::ClassicFile;
pub use error::{Error, Result};
pub use header::{AttrValue, Attribute, Dimension, Format, Header, NcType, Variable};
#[cfg(feature = "netcdf4")]
pub use nc4::Nc4File;
pub use writer::FileBuilder;

const HDF5_MAGIC: &[u8; 4] = b"\x89HDF";

/// An opened netCDF file of any supported flavour.
pub trait NcReader {
    fn header(&self) -> &Header;

    /// Values of `variable` for leading-dimension indices in `range`, in
    /// row-major order, widened to `f64`. Scalars ignore `range`.
    fn read_slab(&mut self, variable: &str, range: Range<usize>) -> Result<Vec<f64>>;

    fn read_all(&mut self, variable: &str) -> Result<Vec<f64>> {
        let var = self.header().require_variable(variable)?;
        let extent = self.header().shape(var).first().copied().unwrap_or(0);
        self.read_slab(variable, 0..extent)
    }
}

/// Identify the on-disk flavour from the leading magic bytes.
pub fn probe(path: &Path) -> Result<Format> {
    let mut magic = [0u8; 4];
    let mut file = File::open(path)?;
    let n = file.read(&mut magic)?;
    match &magic[..n] {
        [b'C', b'D', b'F', 1] => Ok(Format::Classic),
        [b'C', b'D', b'F', 2] => Ok(Format::Offset64),
        [b'C', b'D', b'F', 5] => Ok(Format::Data64),
        m if m == HDF5_MAGIC => Ok(Format::Netcdf4),
        [b'C', b'D', b'F', v] => Err(Error::UnsupportedFormat(format!("CDF version {}", v))),
        _ => Err(Error::NotNetcdf(path.display().to_string())),
    }
}

/// Open `path`, dispatching on its format.
pub fn open(path: &Path) -> Result<Box<dyn NcReader>> {
    match probe(path)? {
        Format::Netcdf4 => open_netcdf4(path),
        _ => Ok(Box::new(ClassicFile::open(path)?)),
    }
}

#[cfg(feature = "netcdf4")]
fn open_netcdf4(path: &Path) -> Result<Box<dyn NcReader>> {
    Ok(Box::new(Nc4File::open(path)?))
}

#[cfg(not(feature = "netcdf4"))]
fn open_netcdf4(path: &Path) -> Result<Box<dyn NcReader>> {
    Err(Error::UnsupportedFormat(format!(
        "{} is netCDF-4/HDF5; rebuild with the `netcdf4` feature",
        path.display()
    )))
}
