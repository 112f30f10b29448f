use std::path::PathBuf;

use expcat_engine::{GetVarOptions, LazyArray, open_variable, select_files};

use crate::Result;
use crate::session::Session;

/// Resolve, select and plan a variable load. Returns before any variable
/// data is read.
pub fn getvar(
    session: &Session,
    experiment: &str,
    variable: &str,
    options: &GetVarOptions,
) -> Result<LazyArray> {
    options.validate()?;

    let resolved = session.resolve(experiment, variable, options.frequency)?;
    let selected = select_files(&resolved, options.n)?;
    let paths: Vec<PathBuf> = selected
        .iter()
        .map(|r| PathBuf::from(&r.file.path))
        .collect();

    tracing::debug!(
        experiment,
        variable,
        resolved = resolved.len(),
        selected = paths.len(),
        "loading variable"
    );

    Ok(open_variable(variable, &paths, options)?)
}
