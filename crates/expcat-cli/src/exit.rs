use std::process::ExitCode;

use expcat_engine::Error as EngineError;
use expcat_index::Error as IndexError;

/// Process exit status for a failed command. Usage errors exit with 2
/// through clap before a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    General = 1,
    /// The catalog is missing, unreadable or from another schema.
    StoreUnavailable = 3,
    /// The named experiment or variable is not catalogued.
    NotFound = 4,
    /// getvar options rejected before any file was opened.
    InvalidOptions = 5,
}

impl Failure {
    pub fn of(err: &anyhow::Error) -> Self {
        err.chain()
            .find_map(|cause| {
                if let Some(e) = index_error(cause) {
                    return match e {
                        IndexError::StoreUnavailable { .. } => Some(Failure::StoreUnavailable),
                        IndexError::ExperimentNotFound(_) | IndexError::VariableNotFound { .. } => {
                            Some(Failure::NotFound)
                        }
                        _ => None,
                    };
                }
                match engine_error(cause) {
                    Some(EngineError::InvalidOptions(_)) => Some(Failure::InvalidOptions),
                    _ => None,
                }
            })
            .unwrap_or(Failure::General)
    }
}

type Cause<'a> = &'a (dyn std::error::Error + 'static);

fn index_error(cause: Cause<'_>) -> Option<&IndexError> {
    match cause.downcast_ref::<expcat_runtime::Error>() {
        Some(expcat_runtime::Error::Index(e)) => Some(e),
        _ => cause.downcast_ref::<IndexError>(),
    }
}

fn engine_error(cause: Cause<'_>) -> Option<&EngineError> {
    match cause.downcast_ref::<expcat_runtime::Error>() {
        Some(expcat_runtime::Error::Engine(e)) => Some(e),
        _ => cause.downcast_ref::<EngineError>(),
    }
}

impl From<Failure> for ExitCode {
    fn from(failure: Failure) -> Self {
        ExitCode::from(failure as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_store_errors_map_through_runtime_and_context() {
        let unavailable = expcat_runtime::Error::Index(IndexError::StoreUnavailable {
            path: PathBuf::from("/tmp/catalog.db"),
            reason: "missing".to_string(),
        });
        let err = anyhow::Error::new(unavailable).context("opening catalog");
        assert_eq!(Failure::of(&err), Failure::StoreUnavailable);

        let missing = anyhow::Error::new(IndexError::ExperimentNotFound("iaf".to_string()));
        assert_eq!(Failure::of(&missing), Failure::NotFound);
    }

    #[test]
    fn test_option_and_other_errors() {
        let options = anyhow::Error::new(EngineError::InvalidOptions("n must be non-zero".into()));
        assert_eq!(Failure::of(&options), Failure::InvalidOptions);
        assert_eq!(Failure::of(&anyhow::anyhow!("no archive roots")), Failure::General);
    }
}
