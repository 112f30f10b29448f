use crate::context::ExecutionContext;
use crate::output::{Palette, print_json};
use anyhow::{Result, bail};
use expcat_index::UpsertOutcome;
use expcat_runtime::{IndexOptions, IndexProgress, IndexService};
use std::path::PathBuf;

pub fn handle(
    ctx: &ExecutionContext,
    roots: Vec<PathBuf>,
    options: IndexOptions,
    show_files: bool,
) -> Result<()> {
    let roots = if roots.is_empty() {
        ctx.config().root_paths()
    } else {
        roots
    };
    if roots.is_empty() {
        bail!(
            "no archive roots given and none configured{}",
            ctx.config_path()
                .map(|p| format!(" in {}", p.display()))
                .unwrap_or_default()
        );
    }

    let db = ctx.open_database()?;
    let palette = Palette::detect();
    let plain = !ctx.is_json();

    let report = IndexService::new(&db, roots, options).run(|progress| {
        if plain {
            render_progress(&palette, progress, show_files);
        }
    })?;

    if ctx.is_json() {
        print_json(&report)?;
    }
    Ok(())
}

fn render_progress(palette: &Palette, progress: IndexProgress, show_files: bool) {
    match progress {
        IndexProgress::IncrementalHint { indexed_files } if indexed_files > 0 => {
            println!(
                "{}",
                palette.dim(&format!(
                    "Incremental update: {} files already catalogued (use --force to re-scan)",
                    indexed_files
                ))
            );
        }
        IndexProgress::IncrementalHint { .. } => {}
        IndexProgress::RootMissing { root } => {
            println!(
                "{} root does not exist: {}",
                palette.warn("warning:"),
                root.display()
            );
        }
        IndexProgress::RootScanning { root } => {
            println!("Scanning {}", palette.name(&root.display().to_string()));
        }
        IndexProgress::FileIndexed { path, outcome } if show_files => {
            let label = match outcome {
                UpsertOutcome::Inserted => palette.ok("added    "),
                UpsertOutcome::Replaced => palette.ok("updated  "),
                UpsertOutcome::Unchanged => palette.dim("unchanged"),
            };
            println!("  {} {}", label, path.display());
        }
        IndexProgress::FileSkipped { path } if show_files => {
            println!("  {} {}", palette.dim("skipped  "), path.display());
        }
        IndexProgress::FileIndexed { .. } | IndexProgress::FileSkipped { .. } => {}
        IndexProgress::FileFailed { path, error } => {
            println!("  {} {}: {}", palette.error("failed"), path.display(), error);
        }
        IndexProgress::FilePruned { path } => {
            println!("  {} {}", palette.warn("pruned   "), path.display());
        }
        IndexProgress::Completed {
            indexed_files,
            skipped_files,
            failed_files,
            pruned_files,
        } => {
            let mut summary = format!(
                "Indexed {} files, {} unchanged, {} failed",
                indexed_files, skipped_files, failed_files
            );
            if pruned_files > 0 {
                summary.push_str(&format!(", {} pruned", pruned_files));
            }
            println!("{}", palette.heading(&summary));
        }
    }
}
