use crate::context::ExecutionContext;
use crate::output::{Palette, format_coverage, print_json, render_table};
use anyhow::Result;
use expcat_types::Frequency;

pub fn handle(ctx: &ExecutionContext, experiment: &str) -> Result<()> {
    let files = ctx.session()?.list_files(experiment)?;

    if ctx.is_json() {
        return print_json(&files);
    }

    let palette = Palette::detect();
    let mut rows = vec![vec![
        "PATH".to_string(),
        "FREQUENCY".to_string(),
        "COVERAGE".to_string(),
    ]];
    rows.extend(files.iter().map(|f| {
        vec![
            f.path.clone(),
            f.frequency.to_string(),
            format_coverage(f.coverage.as_ref()),
        ]
    }));
    for line in render_table(&rows, |c, cell| match c {
        2 => palette.dim(cell),
        _ => cell.to_string(),
    }) {
        println!("{}", line);
    }
    Ok(())
}

pub fn resolve(
    ctx: &ExecutionContext,
    experiment: &str,
    variable: &str,
    frequency: Option<Frequency>,
) -> Result<()> {
    let resolved = ctx.session()?.resolve(experiment, variable, frequency)?;

    if ctx.is_json() {
        return print_json(&resolved);
    }

    let palette = Palette::detect();
    if let Some(first) = resolved.first() {
        let v = &first.variable;
        println!(
            "{} ({}) {} [{}]",
            palette.heading(&v.name),
            v.dimensions.join(", "),
            v.frequency,
            v.units.as_deref().unwrap_or("-")
        );
    }
    let rows: Vec<Vec<String>> = resolved
        .iter()
        .map(|r| vec![r.file.path.clone(), format_coverage(r.variable.coverage.as_ref())])
        .collect();
    for line in render_table(&rows, |c, cell| if c == 1 { palette.dim(cell) } else { cell.to_string() }) {
        println!("  {}", line);
    }
    Ok(())
}
