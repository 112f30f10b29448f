use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the catalog file.
pub const DB_ENV: &str = "EXPCAT_DB";

const CATALOG_FILE: &str = "catalog.db";
const CONFIG_FILE: &str = "config.toml";

/// Resolve the expcat data directory:
/// 1. XDG data directory (recommended default)
/// 2. ~/.expcat (fallback for systems without XDG)
pub fn resolve_data_dir() -> Result<PathBuf> {
    data_dir_from(dirs::data_dir(), dirs::home_dir())
}

fn data_dir_from(data_dir: Option<PathBuf>, home: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(data_dir) = data_dir {
        return Ok(data_dir.join("expcat"));
    }
    if let Some(home) = home {
        return Ok(home.join(".expcat"));
    }
    Err(Error::Config(
        "Could not determine data directory: no HOME directory or XDG data directory found"
            .to_string(),
    ))
}

/// Resolve the catalog path based on priority:
/// 1. Explicit path (`--db`, with tilde expansion)
/// 2. EXPCAT_DB environment variable (with tilde expansion)
/// 3. `database` in the config file
/// 4. `<data dir>/catalog.db`
pub fn resolve_db_path(explicit: Option<&str>, config: &Config) -> Result<PathBuf> {
    let env = std::env::var(DB_ENV).ok().filter(|v| !v.is_empty());
    db_path_from(explicit, env.as_deref(), config, resolve_data_dir)
}

fn db_path_from(
    explicit: Option<&str>,
    env: Option<&str>,
    config: &Config,
    data_dir: impl FnOnce() -> Result<PathBuf>,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(expand_tilde(path));
    }
    if let Some(path) = env {
        return Ok(expand_tilde(path));
    }
    if let Some(path) = &config.database {
        return Ok(expand_tilde(&path.to_string_lossy()));
    }
    Ok(data_dir()?.join(CATALOG_FILE))
}

/// Expand tilde (~) in paths to the user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(path)
}

/// Defaults for `expcat index`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefaults {
    #[serde(default)]
    pub follow_symlinks: bool,
    #[serde(default)]
    pub prune: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Catalog file, overridden by `--db` and EXPCAT_DB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    /// Archive roots indexed when `expcat index` is given none.
    #[serde(default)]
    pub roots: Vec<PathBuf>,
    #[serde(default)]
    pub index: IndexDefaults,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::default_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(resolve_data_dir()?.join(CONFIG_FILE))
    }

    /// Roots with tilde expansion applied.
    pub fn root_paths(&self) -> Vec<PathBuf> {
        self.roots
            .iter()
            .map(|r| expand_tilde(&r.to_string_lossy()))
            .collect()
    }
}
