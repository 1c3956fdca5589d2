//! Core library for the `goldentrace` CLI: turns captured HTTP traffic into
//! golden regression test suites.
//!
//! The pipeline runs [`capture`] (load and normalize) → [`synth`] (group,
//! partition, synthesize) → [`suite`] (order, name, render, write), with an
//! optional [`replay`] against a live service.

pub mod adapters;
pub mod capture;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod ports;
pub mod replay;
pub mod suite;
pub mod synth;

use clap::Parser;

pub use commands::Summary;
pub use error::{Error, Result};

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns [`Error::Cli`] when argument parsing fails, otherwise any error of
/// the generation run.
pub fn run<I, T>(args: I) -> Result<Summary>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args)?;
    commands::dispatch(&cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_errors_without_input() {
        assert!(matches!(run(["goldentrace"]), Err(Error::Cli(_))));
    }

    #[test]
    fn run_errors_on_missing_input() {
        let result = run(["goldentrace", "/definitely/not/here.json"]);
        assert!(matches!(result, Err(Error::InputNotFound(_))));
    }
}
