//! Error types for the generator pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors that abort a generation run.
#[derive(Error, Debug)]
pub enum Error {
    /// Command-line arguments were rejected (or help/version was requested).
    #[error(transparent)]
    Cli(#[from] clap::Error),

    /// The capture file does not exist.
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Reading an input or configuration file failed.
    #[error("failed to read {}: {message}", .path.display())]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying failure.
        message: String,
    },

    /// The capture is not JSON of a recognised shape.
    #[error("invalid capture: {0}")]
    InvalidCapture(String),

    /// The capture holds no usable transactions.
    #[error("no capture data: {0}")]
    EmptyCapture(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// A generated file could not be written.
    #[error("failed to write {}: {message}", .path.display())]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying failure.
        message: String,
    },

    /// The replay client could not be set up.
    #[error("replay error: {0}")]
    Replay(String),

    /// One or more replayed tests did not match the recorded output.
    #[error("replay failed: {failed} of {total} tests did not match")]
    ReplayFailed {
        /// Number of mismatching tests.
        failed: usize,
        /// Number of tests replayed.
        total: usize,
    },
}

/// Convenience alias for results carrying a fatal [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Failure to turn a single captured record into a transaction.
///
/// These never abort a run: the record is skipped and reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// A required field is absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// The flow carries no response.
    #[error("flow has no response")]
    MissingResponse,

    /// The request URL could not be parsed.
    #[error("invalid url `{0}`")]
    InvalidUrl(String),

    /// A body declared as base64 does not decode.
    #[error("invalid base64 body: {0}")]
    InvalidBase64(String),

    /// A request declared as JSON does not parse.
    #[error("request body is not valid JSON: {0}")]
    InvalidJsonBody(String),

    /// The record does not match the source schema.
    #[error("malformed record: {0}")]
    Malformed(String),
}
