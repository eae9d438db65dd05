//! Assetpipe - command-line task runner for front-end assets

use std::process::ExitCode;

use assetpipe::cli;

fn main() -> ExitCode {
    cli::run()
}
