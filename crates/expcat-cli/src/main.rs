use std::process::ExitCode;

use clap::Parser;
use expcat_cli::{Cli, Failure, run};

fn main() -> ExitCode {
    #[cfg(unix)]
    default_sigpipe();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            Failure::of(&e).into()
        }
    }
}

/// Die quietly when stdout closes early, as in `expcat files ... | head`.
#[cfg(unix)]
fn default_sigpipe() {
    // SAFETY: called before any other thread exists.
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}
