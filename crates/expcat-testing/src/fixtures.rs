//! netCDF fixture generation.
//!
//! Files are written with the crate's own classic-format writer, so tests
//! need no sample data on disk and no system netCDF library.

use anyhow::Result;
use std::path::Path;

use expcat_netcdf::{AttrValue, FileBuilder, NcType};
use expcat_types::{Calendar, CalendarDate, TimeUnits};

/// Reference date of every fixture time axis.
pub const FIXTURE_UNITS: &str = "days since 1900-01-01 00:00:00";

/// A gridded data variable in a fixture.
#[derive(Debug, Clone)]
pub struct FixtureVariable {
    pub name: String,
    pub units: String,
    pub long_name: String,
    /// Added to every value so variables are distinguishable.
    pub bias: f64,
}

/// Description of a `time x yt x xt` ocean output file.
///
/// Data values are `time + bias + 0.25 * (j * nx + i)`, so tests can
/// predict every element from the time axis alone.
#[derive(Debug, Clone)]
pub struct TimeSeriesFixture {
    pub units: String,
    pub calendar: Calendar,
    pub times: Vec<f64>,
    pub bounds: Option<Vec<(f64, f64)>>,
    pub ny: usize,
    pub nx: usize,
    pub variables: Vec<FixtureVariable>,
    /// Adds a time-independent `area_t(yt, xt)` variable.
    pub with_static: bool,
}

impl TimeSeriesFixture {
    fn empty(calendar: Calendar) -> Self {
        Self {
            units: FIXTURE_UNITS.to_string(),
            calendar,
            times: Vec::new(),
            bounds: None,
            ny: 2,
            nx: 3,
            variables: vec![
                FixtureVariable {
                    name: "temp".to_string(),
                    units: "degC".to_string(),
                    long_name: "Potential temperature".to_string(),
                    bias: 0.0,
                },
                FixtureVariable {
                    name: "salt".to_string(),
                    units: "psu".to_string(),
                    long_name: "Practical salinity".to_string(),
                    bias: 35.0,
                },
            ],
            with_static: true,
        }
    }

    fn units(&self) -> TimeUnits {
        self.units
            .parse()
            .expect("fixture units are valid CF time units")
    }

    /// One timestamp at the start of each month, `years` years from
    /// January of `start_year`, in the noleap calendar.
    pub fn monthly(start_year: i64, years: u32) -> Self {
        Self::monthly_in(Calendar::NoLeap, start_year, years)
    }

    pub fn monthly_in(calendar: Calendar, start_year: i64, years: u32) -> Self {
        let mut fixture = Self::empty(calendar);
        let units = fixture.units();
        let mut bounds = Vec::new();
        for k in 0..(years as i64 * 12) {
            let start = month_start(start_year, k);
            let end = month_start(start_year, k + 1);
            fixture.times.push(units.encode(&start, calendar));
            bounds.push((units.encode(&start, calendar), units.encode(&end, calendar)));
        }
        fixture.bounds = Some(bounds);
        fixture
    }

    /// One timestamp on 1 January of each year.
    pub fn yearly(start_year: i64, years: u32) -> Self {
        let mut fixture = Self::empty(Calendar::NoLeap);
        let units = fixture.units();
        fixture.times = (0..years as i64)
            .map(|k| units.encode(&CalendarDate::ymd(start_year + k, 1, 1), Calendar::NoLeap))
            .collect();
        fixture
    }

    /// `days` consecutive daily timestamps starting at `start`.
    pub fn daily(start: CalendarDate, days: u32) -> Self {
        let mut fixture = Self::empty(Calendar::NoLeap);
        let origin = fixture.units().encode(&start, Calendar::NoLeap);
        fixture.times = (0..days).map(|d| origin + d as f64).collect();
        fixture
    }

    pub fn without_bounds(mut self) -> Self {
        self.bounds = None;
        self
    }

    /// Keep only time step `index` (and its bounds).
    pub fn only_step(mut self, index: usize) -> Self {
        self.times = vec![self.times[index]];
        self.bounds = self.bounds.map(|b| vec![b[index]]);
        self
    }

    pub fn without_static(mut self) -> Self {
        self.with_static = false;
        self
    }

    pub fn with_units(mut self, units: &str) -> Self {
        let from = self.units();
        let to: TimeUnits = units.parse().expect("valid CF time units");
        let shift = from.rebase_offset(&to, self.calendar);
        let scale = from.unit.seconds() as f64 / to.unit.seconds() as f64;
        self.times = self.times.iter().map(|t| t * scale + shift).collect();
        self.bounds = self.bounds.map(|b| {
            b.iter()
                .map(|(lo, hi)| (lo * scale + shift, hi * scale + shift))
                .collect()
        });
        self.units = units.to_string();
        self
    }

    pub fn with_grid(mut self, ny: usize, nx: usize) -> Self {
        self.ny = ny;
        self.nx = nx;
        self
    }

    pub fn with_variable(mut self, name: &str, units: &str, long_name: &str) -> Self {
        let bias = 100.0 * self.variables.len() as f64;
        self.variables.push(FixtureVariable {
            name: name.to_string(),
            units: units.to_string(),
            long_name: long_name.to_string(),
            bias,
        });
        self
    }

    pub fn only_variables(mut self, names: &[&str]) -> Self {
        self.variables.retain(|v| names.contains(&v.name.as_str()));
        self
    }

    /// Expected value of `variable` at raw time `t`, cell `(j, i)`.
    pub fn expected_value(&self, variable: &str, t: f64, j: usize, i: usize) -> Option<f64> {
        self.variables
            .iter()
            .find(|v| v.name == variable)
            .map(|v| t + v.bias + 0.25 * (j * self.nx + i) as f64)
    }

    pub fn to_builder(&self) -> Result<FileBuilder> {
        let nt = self.times.len();
        let cells = self.ny * self.nx;
        let mut b = FileBuilder::new();
        b.unlimited_dimension("time", nt)
            .dimension("yt", self.ny)
            .dimension("xt", self.nx)
            .global_attribute("title", AttrValue::text("expcat test fixture"));
        if self.bounds.is_some() {
            b.dimension("nv", 2);
        }

        b.add_variable("time", NcType::Double, &["time"], self.times.clone())?
            .add_variable_attribute("time", "units", AttrValue::text(&self.units))?
            .add_variable_attribute("time", "calendar", AttrValue::text(self.calendar.as_str()))?
            .add_variable_attribute("time", "axis", AttrValue::text("T"))?;
        if let Some(bounds) = &self.bounds {
            b.add_variable_attribute("time", "bounds", AttrValue::text("time_bnds"))?;
            let flat = bounds.iter().flat_map(|(lo, hi)| [*lo, *hi]).collect();
            b.add_variable("time_bnds", NcType::Double, &["time", "nv"], flat)?;
        }

        let yt = (0..self.ny).map(|j| -80.0 + j as f64).collect();
        b.add_variable("yt", NcType::Double, &["yt"], yt)?
            .add_variable_attribute("yt", "units", AttrValue::text("degrees_north"))?;
        let xt = (0..self.nx).map(|i| 0.5 + i as f64).collect();
        b.add_variable("xt", NcType::Double, &["xt"], xt)?
            .add_variable_attribute("xt", "units", AttrValue::text("degrees_east"))?;

        for var in &self.variables {
            let mut data = Vec::with_capacity(nt * cells);
            for &t in &self.times {
                data.extend((0..cells).map(|c| t + var.bias + 0.25 * c as f64));
            }
            b.add_variable(&var.name, NcType::Double, &["time", "yt", "xt"], data)?
                .add_variable_attribute(&var.name, "units", AttrValue::text(&var.units))?
                .add_variable_attribute(&var.name, "long_name", AttrValue::text(&var.long_name))?;
        }

        if self.with_static {
            let area = (0..cells).map(|c| 1.0e6 + c as f64).collect();
            b.add_variable("area_t", NcType::Double, &["yt", "xt"], area)?
                .add_variable_attribute("area_t", "units", AttrValue::text("m^2"))?
                .add_variable_attribute("area_t", "long_name", AttrValue::text("tracer cell area"))?;
        }
        Ok(b)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.to_builder()?.write(path)?;
        Ok(())
    }
}

fn month_start(start_year: i64, months_after: i64) -> CalendarDate {
    let year = start_year + months_after.div_euclid(12);
    let month = months_after.rem_euclid(12) as u32 + 1;
    CalendarDate::ymd(year, month, 1)
}

/// Bytes that look like a netCDF file name but are not one.
pub fn write_corrupt_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, b"CDF\x01\x00\x00\x00\x03garbage after a valid magic")?;
    Ok(())
}

/// A structurally valid CDF-1 header whose single variable spans three
/// dimensions of length `u32::MAX`, so its data size does not fit in 64 bits.
pub fn write_oversized_file(path: &Path) -> Result<()> {
    fn name(out: &mut Vec<u8>, s: &str) {
        out.extend((s.len() as u32).to_be_bytes());
        out.extend(s.as_bytes());
        out.resize(out.len() + (4 - s.len() % 4) % 4, 0);
    }

    let mut out = b"CDF\x01".to_vec();
    out.extend(0u32.to_be_bytes());
    out.extend(0x0Au32.to_be_bytes());
    out.extend(3u32.to_be_bytes());
    for dim in ["zt", "yt", "xt"] {
        name(&mut out, dim);
        out.extend(u32::MAX.to_be_bytes());
    }
    out.extend([0u8; 8]);
    out.extend(0x0Bu32.to_be_bytes());
    out.extend(1u32.to_be_bytes());
    name(&mut out, "temp");
    out.extend(3u32.to_be_bytes());
    for id in 0u32..3 {
        out.extend(id.to_be_bytes());
    }
    out.extend([0u8; 8]);
    out.extend(6u32.to_be_bytes());
    out.extend(0u32.to_be_bytes());
    let begin = out.len() as u32 + 4;
    out.extend(begin.to_be_bytes());
    out.extend([0u8; 64]);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use expcat_netcdf::NcReader;

    #[test]
    fn test_monthly_fixture_has_month_start_times() {
        let fixture = TimeSeriesFixture::monthly(1900, 1);
        assert_eq!(fixture.times.len(), 12);
        assert_eq!(fixture.times[0], 0.0);
        assert_eq!(fixture.times[1], 31.0);
        assert_eq!(fixture.times[2], 59.0);
        assert_eq!(fixture.bounds.as_ref().unwrap()[11], (334.0, 365.0));
    }

    #[test]
    fn test_fixture_values_match_expectation() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("f.nc");
        let fixture = TimeSeriesFixture::yearly(1900, 2);
        fixture.write(&path).unwrap();

        let mut reader = expcat_netcdf::open(&path).unwrap();
        let salt = reader.read_slab("salt", 1..2).unwrap();
        assert_eq!(salt.len(), 6);
        assert_eq!(
            salt[4],
            fixture.expected_value("salt", 365.0, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_rebased_units_keep_dates() {
        let fixture = TimeSeriesFixture::yearly(1901, 1).with_units("hours since 1901-01-01");
        assert_eq!(fixture.times, vec![0.0]);
    }
}
