use crate::context::ExecutionContext;
use crate::output::{Palette, print_json, render_table};
use anyhow::Result;
use expcat_types::{Experiment, Frequency};
use serde::Serialize;

pub fn handle(ctx: &ExecutionContext, keyword: Option<&str>) -> Result<()> {
    let experiments = ctx.session()?.list_experiments(keyword)?;

    if ctx.is_json() {
        return print_json(&experiments);
    }

    if experiments.is_empty() {
        match keyword {
            Some(k) => println!("No experiments tagged '{}'.", k),
            None => println!("No experiments catalogued. Run 'expcat index <ROOT>' first."),
        }
        return Ok(());
    }

    let palette = Palette::detect();
    let mut rows = vec![vec![
        "EXPERIMENT".to_string(),
        "CONFIGURATION".to_string(),
        "FILES".to_string(),
        "KEYWORDS".to_string(),
    ]];
    rows.extend(experiments.iter().map(|e| {
        vec![
            e.name.clone(),
            e.configuration.clone(),
            e.file_count.to_string(),
            e.metadata.keywords.join(", "),
        ]
    }));
    for line in render_table(&rows, |c, cell| match c {
        0 => palette.name(cell),
        3 => palette.dim(cell),
        _ => cell.to_string(),
    }) {
        println!("{}", line);
    }
    Ok(())
}

#[derive(Serialize)]
struct ExperimentDetail<'a> {
    #[serde(flatten)]
    experiment: &'a Experiment,
    frequencies: Vec<Frequency>,
}

pub fn show(ctx: &ExecutionContext, name: &str) -> Result<()> {
    let session = ctx.session()?;
    let experiment = session
        .experiment(name)?
        .ok_or_else(|| expcat_index::Error::ExperimentNotFound(name.to_string()))?;
    let frequencies = session.list_frequencies(Some(name))?;

    if ctx.is_json() {
        return print_json(&ExperimentDetail {
            experiment: &experiment,
            frequencies,
        });
    }

    let palette = Palette::detect();
    let meta = &experiment.metadata;
    println!("{}", palette.heading(&experiment.name));
    println!("  configuration  {}", experiment.configuration);
    println!("  directory      {}", experiment.root_dir);
    println!(
        "  outputs        {} directories, {} files",
        experiment.output_dirs.len(),
        experiment.file_count
    );
    let frequencies: Vec<String> = frequencies.iter().map(ToString::to_string).collect();
    println!("  frequencies    {}", frequencies.join(", "));

    let fields = [
        ("contact", &meta.contact),
        ("email", &meta.email),
        ("created", &meta.created),
        ("url", &meta.url),
        ("description", &meta.description),
        ("notes", &meta.notes),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("  {:<13}  {}", label, value.trim());
        }
    }
    if !meta.keywords.is_empty() {
        println!("  keywords       {}", palette.dim(&meta.keywords.join(", ")));
    }
    Ok(())
}

pub fn keywords(ctx: &ExecutionContext) -> Result<()> {
    let keywords = ctx.session()?.list_keywords()?;
    if ctx.is_json() {
        return print_json(&keywords);
    }
    for keyword in keywords {
        println!("{}", keyword);
    }
    Ok(())
}
