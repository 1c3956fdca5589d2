//! Command dispatch: configuration layering and the generation run.

pub mod generate;

use crate::cli::Cli;
use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::Result;
pub use generate::{ResourceSummary, Summary};

/// Runs the generator for parsed arguments on live adapters and prints the
/// report to stdout.
///
/// A `.env` file in the working directory is loaded before the environment
/// is consulted.
///
/// # Errors
///
/// Returns the first fatal error, or [`crate::Error::ReplayFailed`] after the
/// report when a requested replay had mismatches.
pub fn dispatch(cli: &Cli) -> Result<Summary> {
    dotenvy::dotenv().ok();
    let ctx = ServiceContext::live();
    let config = resolve_config(&ctx, cli, |key| std::env::var(key).ok())?;
    tracing::debug!(?config, "resolved configuration");

    let summary = generate::run(&ctx, &cli.input, &config, cli.replay.as_deref())?;
    print!("{summary}");
    if let Some(report) = &summary.replay {
        report.clone().into_result()?;
    }
    Ok(summary)
}

/// Layers configuration: file, then environment, then CLI flags.
///
/// # Errors
///
/// Returns [`crate::Error::Config`] if the file or an environment value is invalid.
pub fn resolve_config<F>(ctx: &ServiceContext, cli: &Cli, var: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = Config::load(ctx, cli.config.as_deref())?;
    config.apply_env(var)?;
    if let Some(out) = &cli.out {
        config.output_dir.clone_from(out);
    }
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(source) = cli.source {
        config.source = source;
    }
    Ok(config)
}
