mod commands;
mod enums;

pub use commands::*;
pub use enums::*;

use clap::Parser;

#[derive(Parser)]
#[command(name = "expcat")]
#[command(about = "Catalog and load ocean-model experiment output", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Catalog file (overrides EXPCAT_DB and the config file)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Config file [default: <data dir>/config.toml]
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[arg(long, default_value = "plain", global = true)]
    pub format: OutputFormat,

    /// Diagnostics on stderr: -v for debug, -vv for trace. RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}
