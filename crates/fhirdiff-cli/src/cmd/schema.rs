//! Implementation of `fhirdiff schema <TYPE>`.
use std::io::Write as _;

use fhirdiff_core::{DiffError, FieldDescriptor, FieldKind, SchemaRegistry};
use serde::Serialize;

use crate::OutputFormat;
use crate::cmd::Context;
use crate::error::{CliError, write_error};
use crate::format::{write_csv, write_json};

#[derive(Serialize)]
struct FieldRow<'a> {
    key: &'a str,
    declared_type: &'a str,
    required: bool,
    kind: &'static str,
    item_type: Option<&'a str>,
}

impl<'a> From<&'a FieldDescriptor> for FieldRow<'a> {
    fn from(f: &'a FieldDescriptor) -> Self {
        let kind = match &f.kind {
            FieldKind::Leaf => "leaf",
            FieldKind::Struct => "struct",
            FieldKind::Array { .. } => "array",
            FieldKind::Unclassified => "unclassified",
        };
        Self {
            key: &f.key,
            declared_type: &f.declared_type,
            required: f.required,
            kind,
            item_type: f.array_item_type(),
        }
    }
}

/// Runs the `schema` command.
///
/// # Errors
///
/// Returns [`CliError::Diff`] if `type_name` is not defined.
pub fn run(ctx: &Context, schema: &SchemaRegistry, type_name: &str) -> Result<(), CliError> {
    let fields = schema.fields(type_name).ok_or_else(|| DiffError::UnknownType {
        type_name: type_name.to_owned(),
        path: type_name.to_owned(),
    })?;
    let rows: Vec<FieldRow<'_>> = fields.iter().map(FieldRow::from).collect();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match ctx.format {
        OutputFormat::Human => {
            let io = |e: std::io::Error| write_error("stdout", &e);
            let width = rows.iter().map(|r| r.key.len()).max().unwrap_or(0);
            for r in &rows {
                let ty = match r.item_type {
                    Some(item) => format!("{item}[]"),
                    None => r.declared_type.to_owned(),
                };
                let required = if r.required { "  required" } else { "" };
                writeln!(out, "{:<width$}  {:<12}  {ty}{required}", r.key, r.kind).map_err(io)?;
            }
            Ok(())
        }
        OutputFormat::Json => write_json(&mut out, &rows),
        OutputFormat::Csv => write_csv(&mut out, &rows),
    }
}
