/// CLI error types with associated exit codes.
///
/// [`CliError`] is the top-level error type for the `fhirdiff` binary. Every
/// variant maps to a stable exit code (1 or 2) via [`CliError::exit_code`]:
///
/// - Exit code **2**: input failure. The tool could not read, parse or
///   resolve the input, so no score was produced.
/// - Exit code **1**: logical failure. The comparison ran to completion but
///   the result fails a requested threshold or check.
use std::fmt;
use std::path::PathBuf;

use fhirdiff_core::DiffError;

/// All error conditions that the `fhirdiff` CLI can produce.
#[derive(Debug)]
pub enum CliError {
    // --- Exit code 2: input failures ---
    /// A file argument could not be found on the filesystem.
    FileNotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// The process lacks permission to read a file.
    PermissionDenied {
        /// The path that could not be read.
        path: PathBuf,
    },

    /// The input exceeds the configured `--max-file-size` limit.
    FileTooLarge {
        /// `"-"` for stdin, or the filesystem path.
        source: String,
        /// The configured size limit in bytes.
        limit: u64,
        /// The actual size in bytes; `None` for stdin.
        actual: Option<u64>,
    },

    /// The input bytes are not valid UTF-8.
    InvalidUtf8 {
        source: String,
        /// The byte offset of the first invalid byte sequence.
        byte_offset: usize,
    },

    /// An I/O error occurred while reading from stdin.
    StdinReadError { detail: String },

    /// A generic I/O error not covered by the more specific variants above.
    IoError { source: String, detail: String },

    /// Both positional inputs were `-`.
    MultipleStdin,

    /// The input is not valid JSON (or NDJSON).
    ParseFailed {
        source: String,
        /// Parser message including line and column.
        detail: String,
    },

    /// The `--config` file could not be parsed.
    InvalidConfig { detail: String },

    /// No type was given and the reference record has no `resourceType`.
    MissingType { source: String },

    /// The comparison engine rejected the input.
    Diff(DiffError),

    // --- Exit code 1: logical failures ---
    /// Root accuracy is below the `--fail-below` threshold.
    BelowThreshold {
        /// Root accuracy; `None` when no leaves were compared.
        accuracy: Option<f64>,
        threshold: f64,
    },

    /// One or more resources failed the structural check.
    ///
    /// The issues have already been printed.
    ValidationErrors,
}

impl CliError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound { .. }
            | Self::PermissionDenied { .. }
            | Self::FileTooLarge { .. }
            | Self::InvalidUtf8 { .. }
            | Self::StdinReadError { .. }
            | Self::IoError { .. }
            | Self::MultipleStdin
            | Self::ParseFailed { .. }
            | Self::InvalidConfig { .. }
            | Self::MissingType { .. }
            | Self::Diff(_) => 2,

            Self::BelowThreshold { .. } | Self::ValidationErrors => 1,
        }
    }

    /// Returns a human-readable error message suitable for printing to stderr.
    pub fn message(&self) -> String {
        match self {
            Self::FileNotFound { path } => {
                format!("error: file not found: {}", path.display())
            }
            Self::PermissionDenied { path } => {
                format!("error: permission denied: {}", path.display())
            }
            Self::FileTooLarge {
                source,
                limit,
                actual: Some(actual),
            } => {
                format!("error: file too large: {source} is {actual} bytes, limit is {limit} bytes")
            }
            Self::FileTooLarge {
                source,
                limit,
                actual: None,
            } => {
                format!("error: file too large: {source} exceeded limit of {limit} bytes")
            }
            Self::InvalidUtf8 {
                source,
                byte_offset,
            } => {
                format!(
                    "error: invalid UTF-8 in {source}: first invalid byte at offset {byte_offset}"
                )
            }
            Self::StdinReadError { detail } => {
                format!("error: failed to read stdin: {detail}")
            }
            Self::IoError { source, detail } => {
                format!("error: I/O error on {source}: {detail}")
            }
            Self::MultipleStdin => "error: at most one input may be `-`".to_owned(),
            Self::ParseFailed { source, detail } => {
                format!("error: invalid JSON in {source}: {detail}")
            }
            Self::InvalidConfig { detail } => format!("error: invalid config: {detail}"),
            Self::MissingType { source } => {
                format!("error: {source} has no resourceType; pass --type")
            }
            Self::Diff(e) => format!("error: {e}"),
            Self::BelowThreshold {
                accuracy: Some(accuracy),
                threshold,
            } => {
                format!("error: accuracy {accuracy:.3} is below {threshold}")
            }
            Self::BelowThreshold {
                accuracy: None,
                threshold,
            } => {
                format!("error: accuracy is undefined (no leaves compared), required {threshold}")
            }
            Self::ValidationErrors => "error: one or more resources are invalid".to_owned(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for CliError {}

impl From<DiffError> for CliError {
    fn from(e: DiffError) -> Self {
        Self::Diff(e)
    }
}

/// Maps a write failure on stdout or stderr.
pub fn write_error(stream: &str, e: &std::io::Error) -> CliError {
    CliError::IoError {
        source: stream.to_owned(),
        detail: e.to_string(),
    }
}
