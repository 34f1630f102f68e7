//! Implementation of `fhirdiff validate <FILE>`.
//!
//! Checks a single resource, or every entry of a bundle, against the
//! schema: declared keys only, required fields present, leaf kinds and
//! date formats correct.
//!
//! Exit codes:
//! - 0 = every resource is valid
//! - 1 = at least one resource is invalid
//! - 2 = unreadable input or invalid JSON
use std::io::Write as _;

use fhirdiff_core::bundle::resource_key;
use fhirdiff_core::{SchemaRegistry, SchemaValidator, ValidationIssue, bundle_resources};
use serde::Serialize;
use serde_json::Value;

use crate::OutputFormat;
use crate::cmd::Context;
use crate::error::{CliError, write_error};
use crate::format::{write_csv, write_json};

#[derive(Serialize)]
struct ResourceVerdict {
    resource: String,
    valid: bool,
    issues: Vec<ValidationIssue>,
}

#[derive(Serialize)]
struct IssueRow<'a> {
    resource: &'a str,
    path: &'a str,
    message: &'a str,
}

/// Runs the `validate` command.
///
/// # Errors
///
/// [`CliError::ValidationErrors`] if any resource has issues.
pub fn run(ctx: &Context, schema: &SchemaRegistry, value: &Value) -> Result<(), CliError> {
    let validator = SchemaValidator::new(schema);
    let verdicts: Vec<ResourceVerdict> = bundle_resources(value)
        .into_iter()
        .enumerate()
        .map(|(index, resource)| {
            let issues = validator.check(resource);
            ResourceVerdict {
                resource: resource_key(resource, index).unwrap_or_else(|| format!("#{index}")),
                valid: issues.is_empty(),
                issues,
            }
        })
        .collect();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match ctx.format {
        OutputFormat::Human => {
            let io = |e: std::io::Error| write_error("stdout", &e);
            for v in &verdicts {
                if v.valid {
                    writeln!(out, "{}: valid", v.resource).map_err(io)?;
                } else {
                    writeln!(out, "{}: {} issue(s)", v.resource, v.issues.len()).map_err(io)?;
                    for issue in &v.issues {
                        writeln!(out, "  {issue}").map_err(io)?;
                    }
                }
            }
        }
        OutputFormat::Json => write_json(&mut out, &verdicts)?,
        OutputFormat::Csv => write_csv(
            &mut out,
            verdicts.iter().flat_map(|v| {
                v.issues.iter().map(|i| IssueRow {
                    resource: &v.resource,
                    path: &i.path,
                    message: &i.message,
                })
            }),
        )?,
    }

    if verdicts.iter().all(|v| v.valid) {
        Ok(())
    } else {
        Err(CliError::ValidationErrors)
    }
}
