/// Output rendering: human tables, JSON documents and CSV rows.
///
/// All command results go to stdout through these writers; logs and errors
/// go to stderr. Ratios that are undefined (zero denominator) render as
/// `n/a` in human mode, `null` in JSON and an empty cell in CSV.
use std::io::Write;

use fhirdiff_core::{ReportRow, ScoreTally, TypeAccuracy, format_ratio};
use serde::Serialize;

use crate::error::{CliError, write_error};

/// Writes `value` as one pretty-printed JSON document followed by a newline.
///
/// # Errors
///
/// Returns an error only if writing fails.
pub fn write_json<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *writer, value).map_err(|e| CliError::IoError {
        source: "stdout".to_owned(),
        detail: e.to_string(),
    })?;
    writeln!(writer).map_err(|e| write_error("stdout", &e))
}

/// Writes `rows` as CSV with a header derived from the row type.
///
/// # Errors
///
/// Returns an error only if writing fails.
pub fn write_csv<W: Write, T: Serialize>(
    writer: &mut W,
    rows: impl IntoIterator<Item = T>,
) -> Result<(), CliError> {
    let map = |e: csv::Error| CliError::IoError {
        source: "stdout".to_owned(),
        detail: e.to_string(),
    };
    let mut out = csv::Writer::from_writer(writer);
    for row in rows {
        out.serialize(row).map_err(map)?;
    }
    out.flush().map_err(|e| write_error("stdout", &e))
}

/// One-line summary of a tally: counts, ratios and validity.
pub fn summary_line(score: &ScoreTally) -> String {
    let validity = match score.is_valid {
        Some(true) => "  valid",
        Some(false) => "  invalid",
        None => "",
    };
    format!(
        "leaves {}  matched {}  added {}  deleted {}  modified {}  accuracy {}  precision {}  recall {}{validity}",
        score.leaves,
        score.matches,
        score.additions,
        score.deletions,
        score.modifications,
        format_ratio(score.accuracy()),
        format_ratio(score.precision()),
        format_ratio(score.recall()),
    )
}

/// Writes report rows as an aligned table, indenting labels by depth.
///
/// # Errors
///
/// Returns an error only if writing fails.
pub fn write_report_table<W: Write>(writer: &mut W, rows: &[ReportRow]) -> Result<(), CliError> {
    let label_width = rows
        .iter()
        .map(|r| r.label.len())
        .max()
        .unwrap_or(0)
        .max("LABEL".len());
    let type_width = rows
        .iter()
        .map(|r| r.resource_type.len())
        .max()
        .unwrap_or(0)
        .max("TYPE".len());

    let io = |e: std::io::Error| write_error("stdout", &e);
    writeln!(
        writer,
        "{:<label_width$}  {:<type_width$}  {:>6} {:>6} {:>6} {:>6} {:>6}  {:>8} {:>9} {:>6}",
        "LABEL", "TYPE", "LEAVES", "MATCH", "ADD", "DEL", "MOD", "ACCURACY", "PRECISION", "RECALL"
    )
    .map_err(io)?;
    for r in rows {
        writeln!(
            writer,
            "{:<label_width$}  {:<type_width$}  {:>6} {:>6} {:>6} {:>6} {:>6}  {:>8} {:>9} {:>6}",
            r.label,
            r.resource_type,
            r.n_leaves,
            r.n_matches,
            r.n_additions,
            r.n_deletions,
            r.n_modifications,
            format_ratio(r.accuracy),
            format_ratio(r.precision),
            format_ratio(r.recall),
        )
        .map_err(io)?;
    }
    Ok(())
}

/// Writes per-type mean accuracy, one line per type.
///
/// # Errors
///
/// Returns an error only if writing fails.
pub fn write_type_table<W: Write>(writer: &mut W, types: &[TypeAccuracy]) -> Result<(), CliError> {
    let width = types
        .iter()
        .map(|t| t.resource_type.len())
        .max()
        .unwrap_or(0)
        .max("TYPE".len());
    let io = |e: std::io::Error| write_error("stdout", &e);
    writeln!(writer, "{:<width$}  {:>6}  {:>8}", "TYPE", "ROWS", "ACCURACY").map_err(io)?;
    for t in types {
        writeln!(
            writer,
            "{:<width$}  {:>6}  {:>8}",
            t.resource_type,
            t.rows,
            format_ratio(t.mean_accuracy)
        )
        .map_err(io)?;
    }
    Ok(())
}
