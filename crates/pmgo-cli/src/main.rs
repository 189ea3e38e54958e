//! CLI entrypoint for the pmgo control client.
//!
//! Delegates to [`pmgo_cli::run`], which loads configuration, parses the
//! operator command, and either talks to the daemon or reads process logs.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Unlocked handles: `logs --follow` shares stdout between worker threads.
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    pmgo_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
