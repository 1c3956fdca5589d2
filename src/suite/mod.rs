//! Suite assembly and writing: one output file per resource.

pub mod manifest;
pub mod pytest;
pub mod render;
pub mod yaml;

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::capture::{ParsedValue, RequestBody};
use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::synth::{synthesize, BodySignature, EndpointGroup, TestCase};
pub use render::{renderer_for, Renderer};

/// Resource names longer than this get a generic file name.
const MAX_RESOURCE_FILE_STEM: usize = 30;

/// The ordered test cases of one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Suite {
    /// Resource name; also the output subdirectory.
    pub resource: String,
    /// Test cases in output order, with unique names.
    pub cases: Vec<TestCase>,
}

impl Suite {
    /// Orders a resource's groups, synthesizes them, and makes names unique.
    ///
    /// Order is `(path, has body, sorted params)` ascending, with parameter
    /// values compared by their coerced type; ties keep signature order. A
    /// repeated name gets `_2`, `_3`, ... in output order.
    #[must_use]
    pub fn assemble(
        resource: &str,
        groups: &[EndpointGroup],
        significant_params: &[String],
    ) -> Self {
        let mut ordered: Vec<&EndpointGroup> = groups.iter().collect();
        ordered.sort_by(|a, b| output_order(a, b));

        let mut used = HashSet::new();
        let cases = ordered
            .into_iter()
            .map(|group| {
                let mut case = synthesize(group, significant_params);
                if !used.insert(case.name.clone()) {
                    let base = case.name.clone();
                    let unique = (2..)
                        .map(|n| format!("{base}_{n}"))
                        .find(|candidate| !used.contains(candidate))
                        .unwrap_or(base);
                    tracing::warn!(
                        resource,
                        name = %case.name,
                        renamed = %unique,
                        "test name collision"
                    );
                    used.insert(unique.clone());
                    case.name = unique;
                }
                case
            })
            .collect();

        Self { resource: resource.to_string(), cases }
    }

    /// File name for this suite with the given extension.
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        if self.resource.chars().count() > MAX_RESOURCE_FILE_STEM {
            format!("test.{extension}")
        } else {
            format!("test_{}.{extension}", self.resource)
        }
    }

    /// Number of cases sending a JSON body.
    #[must_use]
    pub fn json_count(&self) -> usize {
        self.cases.iter().filter(|c| matches!(c.request, RequestBody::Json { .. })).count()
    }

    /// Number of cases uploading a file.
    #[must_use]
    pub fn upload_count(&self) -> usize {
        self.cases
            .iter()
            .filter(|c| matches!(c.request, RequestBody::FileUpload(_)))
            .count()
    }
}

fn output_order(a: &EndpointGroup, b: &EndpointGroup) -> Ordering {
    let has_body = |group: &EndpointGroup| group.signature.body != BodySignature::None;
    a.signature
        .path
        .cmp(&b.signature.path)
        .then_with(|| has_body(a).cmp(&has_body(b)))
        .then_with(|| compare_params(&a.params, &b.params))
}

/// Lexicographic over `(key, value)` pairs in key order.
fn compare_params(
    a: &BTreeMap<String, ParsedValue>,
    b: &BTreeMap<String, ParsedValue>,
) -> Ordering {
    let mut left = a.iter();
    let mut right = b.iter();
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some((ka, va)), Some((kb, vb))) => {
                let ordering = ka.cmp(kb).then_with(|| va.total_cmp(vb));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

/// Renders a suite and writes it to `<output_dir>/<resource>/<file>`.
///
/// # Errors
///
/// Returns [`Error::Write`] if rendering or writing fails.
pub fn write_suite(
    ctx: &ServiceContext,
    output_dir: &Path,
    renderer: &dyn Renderer,
    suite: &Suite,
) -> Result<PathBuf> {
    let path = output_dir.join(&suite.resource).join(suite.file_name(renderer.extension()));
    let content = renderer
        .render(suite)
        .map_err(|message| Error::Write { path: path.clone(), message })?;
    ctx.fs
        .write(&path, &content)
        .map_err(|e| Error::Write { path: path.clone(), message: e.to_string() })?;
    tracing::info!(path = %path.display(), tests = suite.cases.len(), "wrote suite");
    Ok(path)
}
