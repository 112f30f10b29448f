use crate::context::ExecutionContext;
use crate::output::{Palette, print_json};
use anyhow::Result;
use expcat_engine::{Coordinate, GetVarOptions, LazyArray, Stats};
use expcat_types::CalendarDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
struct LoadSummary<'a> {
    name: &'a str,
    dims: &'a [String],
    shape: &'a [usize],
    start: Option<CalendarDate>,
    end: Option<CalendarDate>,
    files: Vec<String>,
    /// Block sizes per dimension.
    chunks: Vec<Vec<usize>>,
    attrs: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<Stats>,
}

impl<'a> LoadSummary<'a> {
    fn new(array: &'a LazyArray) -> Self {
        let time = array.time().unwrap_or_default();
        Self {
            name: &array.name,
            dims: &array.dims,
            shape: &array.shape,
            start: time.first().copied(),
            end: time.last().copied(),
            files: array
                .files()
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            chunks: (0..array.ndim()).map(|axis| array.chunks.sizes(axis)).collect(),
            attrs: &array.attrs,
            stats: None,
        }
    }
}

pub fn handle(
    ctx: &ExecutionContext,
    experiment: &str,
    variable: &str,
    options: &GetVarOptions,
    compute: bool,
) -> Result<()> {
    let array = ctx.session()?.getvar(experiment, variable, options)?;
    let mut summary = LoadSummary::new(&array);
    let mut all_missing = false;

    if compute {
        let data = array.force()?;
        summary.stats = data.stats();
        all_missing = summary.stats.is_none();
    }

    if ctx.is_json() {
        return print_json(&summary);
    }

    let palette = Palette::detect();
    let dims: Vec<String> = summary
        .dims
        .iter()
        .zip(summary.shape)
        .map(|(d, n)| format!("{}: {}", d, n))
        .collect();
    println!("{} ({})", palette.heading(summary.name), dims.join(", "));

    for coord in &array.coords {
        match coord {
            Coordinate::Time {
                name,
                units,
                calendar,
                ..
            } => {
                if let (Some(start), Some(end)) = (summary.start, summary.end) {
                    println!(
                        "  {:<8} {} .. {}  {}",
                        name,
                        start,
                        end,
                        palette.dim(&format!("{}, {}", units, calendar))
                    );
                }
            }
            Coordinate::Values {
                name,
                units,
                values,
            } => {
                let range = match (values.first(), values.last()) {
                    (Some(a), Some(b)) => format!("{} .. {}", a, b),
                    _ => "-".to_string(),
                };
                println!(
                    "  {:<8} {}  {}",
                    name,
                    range,
                    palette.dim(units.as_deref().unwrap_or(""))
                );
            }
        }
    }

    for (key, value) in summary.attrs {
        println!("  {} {}", palette.dim(&format!("{}:", key)), value);
    }
    println!(
        "  {} files, {} chunks",
        summary.files.len(),
        array.chunks.len()
    );

    if let Some(stats) = summary.stats {
        println!(
            "  min {}  max {}  mean {}  ({} values, {} missing)",
            stats.min, stats.max, stats.mean, stats.count, stats.missing
        );
    } else if all_missing {
        println!("  {}", palette.warn("all values are missing"));
    }
    Ok(())
}
