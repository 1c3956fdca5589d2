//! The run manifest written next to the generated suites.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Suite;
use crate::capture::SourceKind;
use crate::context::ServiceContext;
use crate::error::{Error, Result};

/// Manifest file name inside the output directory.
pub const MANIFEST_FILE: &str = "manifest.yaml";

/// What a generation run read and wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// When the run finished.
    pub generated_at: DateTime<Utc>,
    /// Capture file the suites came from.
    pub source_file: PathBuf,
    /// Detected capture format.
    pub source_kind: String,
    /// Transactions normalized.
    pub transactions: usize,
    /// Records skipped with a diagnostic.
    pub skipped: usize,
    /// Endpoint groups, i.e. test cases.
    pub groups: usize,
    /// One entry per written suite, sorted by resource.
    pub resources: Vec<ResourceEntry>,
}

/// A written suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Resource name.
    pub name: String,
    /// Path of the suite file, relative to the output directory.
    pub file: PathBuf,
    /// Test names in file order.
    pub tests: Vec<String>,
}

impl ResourceEntry {
    /// Describes `suite`, written to `path` under `output_dir`.
    #[must_use]
    pub fn new(suite: &Suite, path: &Path, output_dir: &Path) -> Self {
        Self {
            name: suite.resource.clone(),
            file: path.strip_prefix(output_dir).unwrap_or(path).to_path_buf(),
            tests: suite.cases.iter().map(|c| c.name.clone()).collect(),
        }
    }
}

impl Manifest {
    /// Starts a manifest stamped with the context clock.
    #[must_use]
    pub fn new(ctx: &ServiceContext, source_file: &Path, kind: SourceKind) -> Self {
        Self {
            generated_at: ctx.clock.now(),
            source_file: source_file.to_path_buf(),
            source_kind: kind.to_string(),
            transactions: 0,
            skipped: 0,
            groups: 0,
            resources: Vec::new(),
        }
    }

    /// Writes the manifest to `<output_dir>/manifest.yaml`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if serialization or the write fails.
    pub fn write(&self, ctx: &ServiceContext, output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(MANIFEST_FILE);
        let text = serde_yaml::to_string(self)
            .map_err(|e| Error::Write { path: path.clone(), message: e.to_string() })?;
        ctx.fs
            .write(&path, &text)
            .map_err(|e| Error::Write { path: path.clone(), message: e.to_string() })?;
        Ok(path)
    }
}
