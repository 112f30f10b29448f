use std::collections::BTreeMap;
use std::fmt;

use expcat_types::{CalendarDate, Frequency};

use crate::{Error, Result};

/// Options of a `getvar` call. Everything is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetVarOptions {
    /// Required when the variable is catalogued at more than one frequency.
    pub frequency: Option<Frequency>,
    /// Inclusive lower bound on decoded (offset) timestamps.
    pub start_time: Option<CalendarDate>,
    /// Inclusive upper bound on decoded (offset) timestamps.
    pub end_time: Option<CalendarDate>,
    /// First `n` files when positive, last `|n|` when negative.
    pub n: Option<i64>,
    /// Added to raw time values, in each file's own time unit, before decoding.
    pub offset: Option<i64>,
    /// Block size per dimension name.
    pub chunks: BTreeMap<String, usize>,
}

impl GetVarOptions {
    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn start_time(mut self, start: CalendarDate) -> Self {
        self.start_time = Some(start);
        self
    }

    pub fn end_time(mut self, end: CalendarDate) -> Self {
        self.end_time = Some(end);
        self
    }

    pub fn n(mut self, n: i64) -> Self {
        self.n = Some(n);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn chunk(mut self, dimension: &str, size: usize) -> Self {
        self.chunks.insert(dimension.to_string(), size);
        self
    }

    pub fn has_window(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some()
    }

    pub fn in_window(&self, date: &CalendarDate) -> bool {
        self.start_time.is_none_or(|start| start <= *date)
            && self.end_time.is_none_or(|end| *date <= end)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n == Some(0) {
            return Err(Error::InvalidOptions(
                "n must be positive (first files) or negative (last files), not 0".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time)
            && start > end
        {
            return Err(Error::InvalidOptions(format!(
                "start time {} is after end time {}",
                start, end
            )));
        }
        for (dim, size) in &self.chunks {
            if dim.is_empty() {
                return Err(Error::InvalidOptions("chunk dimension name is empty".to_string()));
            }
            if *size == 0 {
                return Err(Error::InvalidOptions(format!(
                    "chunk size for '{}' must be at least 1",
                    dim
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn window(&self) -> Window<'_> {
        Window(self)
    }
}

/// Human-readable time window, for error messages.
pub(crate) struct Window<'a>(&'a GetVarOptions);

impl fmt::Display for Window<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.start_time {
            Some(start) => write!(f, "[{}", start)?,
            None => write!(f, "(..")?,
        }
        match self.0.end_time {
            Some(end) => write!(f, ", {}]", end),
            None => write!(f, ", ..)"),
        }
    }
}

/// Apply the `n` selection to an ordered file list.
pub fn select_files<T>(files: &[T], n: Option<i64>) -> Result<&[T]> {
    match n {
        None => Ok(files),
        Some(0) => Err(Error::InvalidOptions("n must not be 0".to_string())),
        Some(n) if n > 0 => {
            let count = (n as u64).min(files.len() as u64) as usize;
            Ok(&files[..count])
        }
        Some(n) => {
            let count = n.unsigned_abs().min(files.len() as u64) as usize;
            Ok(&files[files.len() - count..])
        }
    }
}

/// Parse `dim=size[,dim=size..]`.
pub fn parse_chunks(spec: &str) -> Result<BTreeMap<String, usize>> {
    let mut chunks = BTreeMap::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (dim, size) = part.split_once('=').ok_or_else(|| {
            Error::InvalidOptions(format!("chunk '{}' is not of the form dim=size", part))
        })?;
        let size = size.trim().parse::<usize>().map_err(|_| {
            Error::InvalidOptions(format!("chunk size '{}' is not a whole number", size.trim()))
        })?;
        chunks.insert(dim.trim().to_string(), size);
    }
    Ok(chunks)
}
