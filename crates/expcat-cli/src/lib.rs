// expcat CLI
// Thin command layer over expcat-runtime: resolves the catalog and config
// once, dispatches to a handler, and renders plain or JSON output

mod args;
mod commands;
pub mod context;
mod exit;
mod handlers;
mod logging;
pub mod output;

pub use args::{Cli, Commands, OutputFormat};
pub use commands::run;
pub use exit::Failure;
