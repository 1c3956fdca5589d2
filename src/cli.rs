//! CLI argument definitions.

use std::path::PathBuf;

use clap::Parser;

use crate::capture::SourceSelection;
use crate::config::OutputFormat;

/// Top-level CLI parser for `goldentrace`.
#[derive(Debug, Parser)]
#[command(
    name = "goldentrace",
    version,
    about = "Turn captured HTTP traffic into golden regression test suites"
)]
pub struct Cli {
    /// Capture file (proxy flow export or recorder JSON).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Directory the suites are written to.
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Output syntax.
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Capture format; detected from the file when omitted.
    #[arg(long, value_enum)]
    pub source: Option<SourceSelection>,

    /// Configuration file (defaults to `goldentrace.yaml` when present).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Replay every generated test against this base URL after writing.
    #[arg(long, value_name = "BASE_URL")]
    pub replay: Option<String>,
}
