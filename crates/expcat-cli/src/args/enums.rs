use clap::ValueEnum;

/// How query results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned tables for people
    #[default]
    Plain,
    /// Pretty-printed JSON for scripts
    Json,
}
