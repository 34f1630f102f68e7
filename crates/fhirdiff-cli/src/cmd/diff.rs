//! Implementation of `fhirdiff diff <TRUE> <PRED>`.
//!
//! Compares a predicted record with a reference record and prints one row
//! per node of the diff tree, followed by the root tally.
//!
//! Flags:
//! - `--type <T>`: type to compare under (default: the reference's
//!   `resourceType`).
//! - `--fail-below <F>`: exit 1 if root accuracy is below `F`.
//!
//! Exit codes:
//! - 0 = compared (and above the threshold, if one was given)
//! - 1 = accuracy below `--fail-below`
//! - 2 = unreadable input, invalid JSON or unknown type
use std::io::Write as _;

use fhirdiff_core::{Comparator, DiffWarning, Report, ReportRow, SchemaRegistry, ScoreTally};
use serde::Serialize;
use serde_json::Value;

use crate::OutputFormat;
use crate::cmd::{Context, resolve_type};
use crate::error::{CliError, write_error};
use crate::format::{summary_line, write_csv, write_json, write_report_table};

#[derive(Serialize)]
struct DiffOutput<'r> {
    type_name: &'r str,
    score: ScoreTally,
    accuracy: Option<f64>,
    precision: Option<f64>,
    recall: Option<f64>,
    rows: &'r [ReportRow],
    warnings: &'r [DiffWarning],
}

/// Runs the `diff` command.
///
/// # Errors
///
/// - [`CliError::MissingType`] / [`CliError::Diff`]: the records cannot be
///   compared.
/// - [`CliError::BelowThreshold`]: root accuracy is under `fail_below`.
pub fn run(
    ctx: &Context,
    schema: &SchemaRegistry,
    true_value: &Value,
    pred_value: &Value,
    true_source: &str,
    type_name: Option<&str>,
    fail_below: Option<f64>,
) -> Result<(), CliError> {
    let type_name = resolve_type(type_name, true_value, true_source)?;
    let comparator = Comparator::with_config(schema, ctx.config.clone());
    let tree = comparator.compare(true_value, pred_value, &type_name)?;
    let report = Report::from_tree(&tree);
    let score = tree.score();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match ctx.format {
        OutputFormat::Human => {
            write_report_table(&mut out, &report.rows)?;
            writeln!(out).map_err(|e| write_error("stdout", &e))?;
            writeln!(out, "{type_name}: {}", summary_line(&score))
                .map_err(|e| write_error("stdout", &e))?;
        }
        OutputFormat::Json => write_json(
            &mut out,
            &DiffOutput {
                type_name: &type_name,
                score,
                accuracy: score.accuracy(),
                precision: score.precision(),
                recall: score.recall(),
                rows: &report.rows,
                warnings: &tree.warnings,
            },
        )?,
        OutputFormat::Csv => write_csv(&mut out, &report.rows)?,
    }

    check_threshold(score.accuracy(), fail_below)
}

/// Fails when a threshold is set and `accuracy` is undefined or below it.
fn check_threshold(accuracy: Option<f64>, threshold: Option<f64>) -> Result<(), CliError> {
    let Some(threshold) = threshold else {
        return Ok(());
    };
    match accuracy {
        Some(a) if a >= threshold => Ok(()),
        Some(_) | None => Err(CliError::BelowThreshold {
            accuracy,
            threshold,
        }),
    }
}
