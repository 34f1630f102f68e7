/// Input loading for the `fhirdiff` binary.
///
/// Every command reads JSON: one record or bundle per file, an NDJSON file of
/// record pairs for `batch`, and an optional `--config` object. All of it
/// goes through [`load_text`], which enforces `--max-file-size`, decodes
/// UTF-8 and labels errors with the source (`-` for stdin). `fhirdiff-core`
/// never touches the filesystem.
///
/// All errors map to [`CliError`] variants with exit code 2.
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use fhirdiff_core::{DiffConfig, RecordPair};
use serde_json::Value;

use crate::PathOrStdin;
use crate::error::CliError;

/// Label used for `source` in error messages.
pub fn source_label(source: &PathOrStdin) -> String {
    match source {
        PathOrStdin::Path(path) => path.display().to_string(),
        PathOrStdin::Stdin => "-".to_owned(),
    }
}

/// Fails if more than one of `sources` is stdin.
///
/// # Errors
///
/// Returns [`CliError::MultipleStdin`].
pub fn ensure_single_stdin(sources: &[&PathOrStdin]) -> Result<(), CliError> {
    let stdin_count = sources
        .iter()
        .filter(|s| matches!(s, PathOrStdin::Stdin))
        .count();
    if stdin_count > 1 {
        return Err(CliError::MultipleStdin);
    }
    Ok(())
}

/// Reads `source` and parses it as one JSON document.
///
/// # Errors
///
/// Any [`load_text`] error, or [`CliError::ParseFailed`] with the line and
/// column of the first syntax error.
pub fn read_json(source: &PathOrStdin, max_size: u64) -> Result<Value, CliError> {
    let text = load_text(source, max_size)?;
    serde_json::from_str(&text).map_err(|e| CliError::ParseFailed {
        source: source_label(source),
        detail: format!("line {}, column {}: {e}", e.line(), e.column()),
    })
}

/// Reads `source` as NDJSON record pairs; blank lines are skipped.
///
/// # Errors
///
/// Any [`load_text`] error, or [`CliError::ParseFailed`] naming the first
/// line that is not a valid pair.
pub fn read_pairs(source: &PathOrStdin, max_size: u64) -> Result<Vec<RecordPair>, CliError> {
    let text = load_text(source, max_size)?;
    let label = source_label(source);
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| CliError::ParseFailed {
                source: label.clone(),
                detail: format!("line {}: {e}", i + 1),
            })
        })
        .collect()
}

/// Loads a [`DiffConfig`] from `--config`, or the defaults.
///
/// # Errors
///
/// Any read error, or [`CliError::InvalidConfig`] for unknown keys,
/// mistyped values and out-of-range settings.
pub fn load_config(path: Option<&Path>, max_size: u64) -> Result<DiffConfig, CliError> {
    let Some(path) = path else {
        return Ok(DiffConfig::default());
    };
    let text = load_text(&PathOrStdin::Path(path.to_path_buf()), max_size)?;
    let invalid = |detail: String| CliError::InvalidConfig {
        detail: format!("{}: {detail}", path.display()),
    };
    let config: DiffConfig = serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;
    config.validate().map_err(|e| invalid(e.to_string()))?;
    Ok(config)
}

/// Reads `source` to a string of at most `max_size` bytes.
///
/// A file larger than the limit is rejected from its metadata before it is
/// opened for reading. Stdin is read through a cap of one byte past the
/// limit, so an oversized stream is detected without buffering it whole.
fn load_text(source: &PathOrStdin, max_size: u64) -> Result<String, CliError> {
    let label = source_label(source);
    let bytes = match source {
        PathOrStdin::Path(path) => {
            let len = std::fs::metadata(path)
                .map_err(|e| open_error(&e, path))?
                .len();
            if len > max_size {
                return Err(CliError::FileTooLarge {
                    source: label,
                    limit: max_size,
                    actual: Some(len),
                });
            }
            let file = File::open(path).map_err(|e| open_error(&e, path))?;
            read_capped(file, max_size).map_err(|e| CliError::IoError {
                source: label.clone(),
                detail: e.to_string(),
            })?
        }
        PathOrStdin::Stdin => read_capped(std::io::stdin().lock(), max_size).map_err(|e| {
            CliError::StdinReadError {
                detail: e.to_string(),
            }
        })?,
    };

    // A file may grow between the metadata check and the read.
    if bytes.len() as u64 > max_size {
        return Err(CliError::FileTooLarge {
            source: label,
            limit: max_size,
            actual: None,
        });
    }
    String::from_utf8(bytes).map_err(|e| CliError::InvalidUtf8 {
        source: label,
        byte_offset: e.utf8_error().valid_up_to(),
    })
}

/// Reads at most `max_size + 1` bytes from `reader`.
fn read_capped(reader: impl Read, max_size: u64) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader
        .take(max_size.saturating_add(1))
        .read_to_end(&mut buf)?;
    Ok(buf)
}

fn open_error(e: &std::io::Error, path: &Path) -> CliError {
    let kind = e.kind();
    if kind == ErrorKind::NotFound {
        CliError::FileNotFound {
            path: path.to_path_buf(),
        }
    } else if kind == ErrorKind::PermissionDenied {
        CliError::PermissionDenied {
            path: path.to_path_buf(),
        }
    } else {
        CliError::IoError {
            source: path.display().to_string(),
            detail: e.to_string(),
        }
    }
}
