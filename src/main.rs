//! Binary entrypoint for the `goldentrace` CLI.

use std::io;
use std::process::ExitCode;

use goldentrace::Error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match goldentrace::run(std::env::args_os()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(Error::Cli(err)) => err.exit(),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
