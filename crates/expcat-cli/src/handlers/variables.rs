use crate::context::ExecutionContext;
use crate::output::{Palette, format_coverage, print_json, render_table};
use anyhow::Result;
use expcat_types::Frequency;

pub fn handle(
    ctx: &ExecutionContext,
    experiment: &str,
    frequency: Option<Frequency>,
    detail: bool,
) -> Result<()> {
    let session = ctx.session()?;

    if !detail {
        let names = session.list_variables(experiment, frequency)?;
        if ctx.is_json() {
            return print_json(&names);
        }
        for name in names {
            println!("{}", name);
        }
        return Ok(());
    }

    let summaries = session.variable_summaries(experiment, frequency)?;
    if ctx.is_json() {
        return print_json(&summaries);
    }

    let palette = Palette::detect();
    let mut rows = vec![vec![
        "VARIABLE".to_string(),
        "FREQUENCY".to_string(),
        "UNITS".to_string(),
        "FILES".to_string(),
        "COVERAGE".to_string(),
        "LONG NAME".to_string(),
    ]];
    rows.extend(summaries.iter().map(|s| {
        vec![
            s.name.clone(),
            s.frequency.to_string(),
            s.units.clone().unwrap_or_else(|| "-".to_string()),
            s.file_count.to_string(),
            format_coverage(s.coverage.as_ref()),
            s.long_name.clone().unwrap_or_default(),
        ]
    }));
    for line in render_table(&rows, |c, cell| match c {
        0 => palette.name(cell),
        4 | 5 => palette.dim(cell),
        _ => cell.to_string(),
    }) {
        println!("{}", line);
    }
    Ok(())
}

pub fn frequencies(ctx: &ExecutionContext, experiment: Option<&str>) -> Result<()> {
    let frequencies = ctx.session()?.list_frequencies(experiment)?;
    if ctx.is_json() {
        return print_json(&frequencies);
    }
    for frequency in frequencies {
        println!("{}", frequency);
    }
    Ok(())
}
