//! netwatchd binary entry point.

use std::process::ExitCode;

use clap::Parser;
use netwatchd::cli_app::{self, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();
    cli_app::init_logging(&cli);
    match cli_app::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Startup failures must reach the user even under --quiet.
            eprintln!("netwatchd: {err}");
            ExitCode::FAILURE
        }
    }
}
