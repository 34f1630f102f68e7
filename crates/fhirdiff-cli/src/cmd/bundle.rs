//! Implementation of `fhirdiff bundle <TRUE> <PRED>`.
//!
//! Maps each reference resource to its best predicted resource of the same
//! type and reports per-resource, per-type and whole-bundle accuracy.
use std::io::Write as _;

use fhirdiff_core::{BundleConfig, BundleDistance, Comparator, SchemaRegistry, compare_bundles, format_ratio};
use serde::Serialize;
use serde_json::Value;

use crate::OutputFormat;
use crate::cmd::Context;
use crate::error::{CliError, write_error};
use crate::format::{write_csv, write_json};

#[derive(Serialize)]
struct ResourceRow<'a> {
    key: &'a str,
    resource_type: &'a str,
    matched: Option<&'a str>,
    accuracy: f64,
}

/// Runs the `bundle` command.
///
/// # Errors
///
/// Returns an error if a resource lacks a `resourceType`, a pair cannot be
/// compared, or stdout fails.
pub fn run(
    ctx: &Context,
    schema: &SchemaRegistry,
    true_value: &Value,
    pred_value: &Value,
    min_similarity: Option<f64>,
) -> Result<(), CliError> {
    let config = match min_similarity {
        Some(min_similarity) => BundleConfig { min_similarity },
        None => BundleConfig::default(),
    };
    let comparator = Comparator::with_config(schema, ctx.config.clone());
    let distance = compare_bundles(&comparator, true_value, pred_value, &config)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match ctx.format {
        OutputFormat::Human => write_human(&mut out, &distance),
        OutputFormat::Json => write_json(&mut out, &distance),
        OutputFormat::Csv => write_csv(
            &mut out,
            distance.resources.iter().map(|r| ResourceRow {
                key: &r.key,
                resource_type: &r.resource_type,
                matched: r.matched.as_deref(),
                accuracy: r.accuracy,
            }),
        ),
    }
}

fn write_human<W: std::io::Write>(out: &mut W, d: &BundleDistance) -> Result<(), CliError> {
    let io = |e: std::io::Error| write_error("stdout", &e);
    let width = d
        .resources
        .iter()
        .map(|r| r.key.len())
        .max()
        .unwrap_or(0)
        .max("RESOURCE".len());
    writeln!(out, "{:<width$}  {:<width$}  {:>8}", "RESOURCE", "MATCHED", "ACCURACY").map_err(io)?;
    for r in &d.resources {
        writeln!(
            out,
            "{:<width$}  {:<width$}  {:>8}",
            r.key,
            r.matched.as_deref().unwrap_or("-"),
            format_ratio(Some(r.accuracy))
        )
        .map_err(io)?;
    }
    writeln!(out).map_err(io)?;
    for (resource_type, mean) in &d.by_type {
        writeln!(out, "{resource_type}: {}", format_ratio(Some(*mean))).map_err(io)?;
    }
    writeln!(out, "bundle: {}", format_ratio(d.mean_accuracy)).map_err(io)?;
    writeln!(out, "valid predictions: {}", format_ratio(d.validity_ratio)).map_err(io)?;
    if !d.unmatched_pred.is_empty() {
        writeln!(out, "unmatched predictions: {}", d.unmatched_pred.join(", ")).map_err(io)?;
    }
    Ok(())
}
