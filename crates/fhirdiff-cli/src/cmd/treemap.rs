//! Implementation of `fhirdiff treemap <TRUE> <PRED>`.
//!
//! Emits one entry per diff node for a hierarchical plot. Entries carry raw
//! values, so the output is always JSON regardless of `--format`.
use fhirdiff_core::{Comparator, SchemaRegistry, treemap_entries};
use serde_json::Value;

use crate::cmd::{Context, resolve_type};
use crate::error::CliError;
use crate::format::write_json;

/// Runs the `treemap` command.
///
/// # Errors
///
/// Returns an error if the records cannot be compared or stdout fails.
pub fn run(
    ctx: &Context,
    schema: &SchemaRegistry,
    true_value: &Value,
    pred_value: &Value,
    true_source: &str,
    type_name: Option<&str>,
) -> Result<(), CliError> {
    let type_name = resolve_type(type_name, true_value, true_source)?;
    let comparator = Comparator::with_config(schema, ctx.config.clone());
    let tree = comparator.compare(true_value, pred_value, &type_name)?;
    let entries = treemap_entries(&tree);
    tracing::debug!(entries = entries.len(), "built treemap");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_json(&mut out, &entries)
}
