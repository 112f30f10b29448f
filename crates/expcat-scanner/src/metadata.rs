use std::path::Path;

use expcat_types::ExperimentMetadata;

use crate::{Error, Result};

pub const METADATA_FILE: &str = "metadata.yaml";

/// Read `<experiment_dir>/metadata.yaml`. A missing file yields empty metadata.
pub fn read_experiment_metadata(experiment_dir: &Path) -> Result<ExperimentMetadata> {
    let path = experiment_dir.join(METADATA_FILE);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ExperimentMetadata::default());
        }
        Err(err) => return Err(err.into()),
    };
    if content.trim().is_empty() {
        return Ok(ExperimentMetadata::default());
    }

    let mut metadata: ExperimentMetadata =
        serde_yaml::from_str(&content).map_err(|source| Error::Metadata { path, source })?;
    metadata.keywords.iter_mut().for_each(|k| *k = k.trim().to_lowercase());
    metadata.keywords.retain(|k| !k.is_empty());
    metadata.keywords.sort();
    metadata.keywords.dedup();
    Ok(metadata)
}
