//! Implementation of `fhirdiff batch <FILE>`.
//!
//! Scores every line of an NDJSON file of record pairs and prints mean
//! accuracy per type and overall. Pairs that cannot be compared are logged
//! and counted; they do not stop the batch.
use std::io::Write as _;

use fhirdiff_core::{Comparator, RecordPair, SchemaRegistry, evaluate_pairs, format_ratio};

use crate::OutputFormat;
use crate::cmd::Context;
use crate::error::{CliError, write_error};
use crate::format::{write_csv, write_json, write_type_table};

/// Runs the `batch` command.
///
/// # Errors
///
/// Returns an error only if stdout fails.
pub fn run(ctx: &Context, schema: &SchemaRegistry, pairs: Vec<RecordPair>) -> Result<(), CliError> {
    let comparator = Comparator::with_config(schema, ctx.config.clone());
    let summary = evaluate_pairs(&comparator, pairs);
    tracing::info!(pairs = summary.pairs, failed = summary.failed(), "batch evaluated");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match ctx.format {
        OutputFormat::Human => {
            let io = |e: std::io::Error| write_error("stdout", &e);
            write_type_table(&mut out, &summary.by_type)?;
            writeln!(out).map_err(io)?;
            writeln!(
                out,
                "{} pairs, {} failed, overall accuracy {}",
                summary.pairs,
                summary.failed(),
                format_ratio(summary.overall_mean)
            )
            .map_err(io)?;
            Ok(())
        }
        OutputFormat::Json => write_json(&mut out, &summary),
        OutputFormat::Csv => write_csv(&mut out, &summary.by_type),
    }
}
