//! The generation pipeline: capture file in, suite files out.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::capture::{Capture, Normalized, SourceKind};
use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::replay::{self, ReplayReport};
use crate::suite::manifest::{Manifest, ResourceEntry};
use crate::suite::{renderer_for, write_suite, Suite};
use crate::synth::{group, partition};

/// Per-resource line of the run report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSummary {
    /// Resource name.
    pub name: String,
    /// Written suite file.
    pub file: PathBuf,
    /// Number of test cases.
    pub tests: usize,
    /// Cases sending a JSON body.
    pub json_bodies: usize,
    /// Cases uploading a file.
    pub uploads: usize,
}

/// What a generation run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Capture file read.
    pub input: PathBuf,
    /// Detected capture format.
    pub source: SourceKind,
    /// Transactions normalized.
    pub transactions: usize,
    /// Records skipped with a diagnostic.
    pub skipped: usize,
    /// Endpoint groups, one test case each.
    pub groups: usize,
    /// Written suites, sorted by resource.
    pub resources: Vec<ResourceSummary>,
    /// Manifest path, when one was written.
    pub manifest: Option<PathBuf>,
    /// Replay outcomes, when a replay was requested.
    pub replay: Option<ReplayReport>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Capture: {} ({})", self.input.display(), self.source)?;
        writeln!(f, "Transactions: {} ({} skipped)", self.transactions, self.skipped)?;
        writeln!(f, "Endpoint groups: {}", self.groups)?;
        writeln!(f, "Resources: {}", self.resources.len())?;
        for resource in &self.resources {
            writeln!(
                f,
                "  {}: {} tests, {} with JSON body, {} with file upload -> {}",
                resource.name,
                resource.tests,
                resource.json_bodies,
                resource.uploads,
                resource.file.display()
            )?;
        }
        if let Some(manifest) = &self.manifest {
            writeln!(f, "Manifest: {}", manifest.display())?;
        }
        if let Some(report) = &self.replay {
            let failed = report.failed();
            writeln!(f, "Replay: {} passed, {failed} failed", report.outcomes.len() - failed)?;
            for outcome in report.outcomes.iter().filter(|o| !o.passed()) {
                for mismatch in &outcome.mismatches {
                    writeln!(f, "  FAIL {}::{}: {mismatch}", outcome.resource, outcome.name)?;
                }
            }
        }
        Ok(())
    }
}

/// Runs the whole pipeline for `input` with a resolved configuration.
///
/// Replay mismatches are reported in the summary, not as an error.
///
/// # Errors
///
/// Returns any fatal [`Error`]: unreadable or empty capture, write failures,
/// or a replay client that cannot start.
pub fn run(
    ctx: &ServiceContext,
    input: &Path,
    config: &Config,
    replay_url: Option<&str>,
) -> Result<Summary> {
    let capture = Capture::load(ctx, input, config.source)?;
    let source = capture.kind;
    tracing::info!(%source, records = capture.records.len(), "loaded capture");

    let Normalized { transactions, diagnostics } = capture.normalize();
    if transactions.is_empty() {
        return Err(Error::EmptyCapture(format!(
            "all {} records were skipped",
            diagnostics.len()
        )));
    }
    let transaction_count = transactions.len();

    let groups = group(transactions);
    let group_count = groups.len();
    tracing::info!(
        transactions = transaction_count,
        groups = group_count,
        "grouped transactions"
    );

    let suites: Vec<Suite> = partition(groups, &config.resource_stoplist)
        .iter()
        .map(|(resource, groups)| Suite::assemble(resource, groups, &config.significant_params))
        .collect();

    let renderer = renderer_for(config);
    let mut manifest = Manifest::new(ctx, input, source);
    let mut resources = Vec::with_capacity(suites.len());
    for suite in &suites {
        let path = write_suite(ctx, &config.output_dir, renderer.as_ref(), suite)?;
        manifest.resources.push(ResourceEntry::new(suite, &path, &config.output_dir));
        resources.push(ResourceSummary {
            name: suite.resource.clone(),
            file: path,
            tests: suite.cases.len(),
            json_bodies: suite.json_count(),
            uploads: suite.upload_count(),
        });
    }

    manifest.transactions = transaction_count;
    manifest.skipped = diagnostics.len();
    manifest.groups = group_count;
    let manifest_path = if config.write_manifest {
        Some(manifest.write(ctx, &config.output_dir)?)
    } else {
        None
    };

    let replay = replay_url.map(|url| replay::replay(url, &suites)).transpose()?;

    Ok(Summary {
        input: input.to_path_buf(),
        source,
        transactions: transaction_count,
        skipped: diagnostics.len(),
        groups: group_count,
        resources,
        manifest: manifest_path,
        replay,
    })
}
