//! Generator configuration: YAML file, environment, then CLI flags.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::capture::SourceSelection;
use crate::context::ServiceContext;
use crate::error::{Error, Result};

/// Configuration file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "goldentrace.yaml";

/// Environment variable overriding [`Config::output_dir`].
pub const ENV_OUT_DIR: &str = "GOLDENTRACE_OUT_DIR";
/// Environment variable overriding [`Config::format`].
pub const ENV_FORMAT: &str = "GOLDENTRACE_FORMAT";
/// Environment variable overriding [`Config::source`].
pub const ENV_SOURCE: &str = "GOLDENTRACE_SOURCE";

/// Target syntax for generated suites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Async pytest functions.
    #[default]
    Pytest,
    /// The structured test-case model as YAML.
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pytest" => Ok(Self::Pytest),
            "yaml" => Ok(Self::Yaml),
            other => Err(format!("unknown output format `{other}`")),
        }
    }
}

impl FromStr for SourceSelection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "proxy" => Ok(Self::Proxy),
            "recorder" => Ok(Self::Recorder),
            other => Err(format!("unknown capture source `{other}`")),
        }
    }
}

/// Settings for one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory for generated suites.
    pub output_dir: PathBuf,
    /// Target syntax.
    pub format: OutputFormat,
    /// Capture source, or auto-detection.
    pub source: SourceSelection,
    /// Query parameters that contribute to test names, in suffix order.
    pub significant_params: Vec<String>,
    /// Path segments never used as a resource name.
    pub resource_stoplist: Vec<String>,
    /// Name of the HTTP client fixture used by pytest suites.
    pub client_fixture: String,
    /// Whether to write `manifest.yaml` next to the suites.
    pub write_manifest: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated_tests"),
            format: OutputFormat::default(),
            source: SourceSelection::default(),
            significant_params: [
                "search",
                "current_page",
                "limit",
                "status",
                "start_date",
                "end_date",
                "page_size",
                "time_type",
                "pool_type",
                "is_rejected",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            resource_stoplist: ["workspace", "new_operplan", "perspective_plan"]
                .into_iter()
                .map(String::from)
                .collect(),
            client_fixture: "fast_api_client".into(),
            write_manifest: true,
        }
    }
}

impl Config {
    /// Loads the configuration file, falling back to defaults.
    ///
    /// An explicit path must exist; otherwise [`DEFAULT_CONFIG_FILE`] is read
    /// when present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if an explicit file is missing or any file
    /// fails to parse.
    pub fn load(ctx: &ServiceContext, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) if !ctx.fs.exists(path) => {
                return Err(Error::Config(format!("config file not found: {}", path.display())))
            }
            Some(path) => path.to_path_buf(),
            None if ctx.fs.exists(Path::new(DEFAULT_CONFIG_FILE)) => {
                PathBuf::from(DEFAULT_CONFIG_FILE)
            }
            None => return Ok(Self::default()),
        };

        let content = ctx
            .fs
            .read_to_string(&path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "loaded configuration file");
        Self::from_yaml(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Parses configuration YAML; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns the YAML error when the document is invalid.
    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Applies environment overrides looked up through `var`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unrecognised format or source value.
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = var(ENV_OUT_DIR).filter(|v| !v.is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(format) = var(ENV_FORMAT).filter(|v| !v.is_empty()) {
            self.format = format.parse().map_err(Error::Config)?;
        }
        if let Some(source) = var(ENV_SOURCE).filter(|v| !v.is_empty()) {
            self.source = source.parse().map_err(Error::Config)?;
        }
        Ok(())
    }
}
