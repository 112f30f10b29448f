use crate::context::ExecutionContext;
use crate::output::{Palette, print_json};
use anyhow::Result;
use expcat_index::CatalogCounts;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct CatalogInfo<'a> {
    database: &'a Path,
    config: Option<&'a Path>,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    counts: Option<CatalogCounts>,
}

pub fn handle(ctx: &ExecutionContext) -> Result<()> {
    let exists = ctx.db_path().exists();
    let counts = if exists {
        Some(ctx.session()?.counts()?)
    } else {
        None
    };

    let info = CatalogInfo {
        database: ctx.db_path(),
        config: ctx.config_path(),
        exists,
        counts,
    };

    if ctx.is_json() {
        return print_json(&info);
    }

    let palette = Palette::detect();
    println!("{}", palette.heading("Catalog"));
    println!("  database  {}", info.database.display());
    match info.config {
        Some(path) if path.exists() => println!("  config    {}", path.display()),
        Some(path) => println!("  config    {} {}", path.display(), palette.dim("(not present)")),
        None => println!("  config    {}", palette.dim("(no data directory)")),
    }
    match info.counts {
        Some(c) => {
            println!("  configurations  {}", c.configurations);
            println!("  experiments     {}", c.experiments);
            println!("  files           {}", c.files);
            println!("  variables       {}", c.variables);
        }
        None => println!("  {}", palette.warn("not created yet; run 'expcat index <ROOT>'")),
    }
    Ok(())
}
