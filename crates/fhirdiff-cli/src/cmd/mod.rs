/// Command module for the `fhirdiff` CLI.
///
/// Each submodule implements one subcommand. The `run` function in each
/// module takes the parsed arguments and returns `Ok(())` on success or
/// a [`crate::error::CliError`] on failure.
pub mod batch;
pub mod bundle;
pub mod diff;
pub mod schema;
pub mod treemap;
pub mod validate;

use fhirdiff_core::{DiffConfig, Record};
use serde_json::Value;

use crate::OutputFormat;
use crate::error::CliError;

/// Settings shared by every subcommand, derived from the global flags.
#[derive(Debug, Clone)]
pub struct Context {
    pub format: OutputFormat,
    pub max_file_size: u64,
    pub config: DiffConfig,
}

/// The type to compare `true_value` under: `explicit` if given, else its
/// `resourceType`.
///
/// # Errors
///
/// Returns [`CliError::MissingType`] when neither is available.
pub fn resolve_type(
    explicit: Option<&str>,
    true_value: &Value,
    source: &str,
) -> Result<String, CliError> {
    explicit
        .or_else(|| Record::present(true_value).resource_type())
        .map(str::to_owned)
        .ok_or_else(|| CliError::MissingType {
            source: source.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use serde_json::json;

    use super::*;

    #[test]
    fn explicit_type_wins() {
        let v = json!({"resourceType": "Patient"});
        assert_eq!(resolve_type(Some("HumanName"), &v, "a").expect("type"), "HumanName");
        assert_eq!(resolve_type(None, &v, "a").expect("type"), "Patient");
    }

    #[test]
    fn missing_type_names_the_source() {
        let err = resolve_type(None, &json!({}), "a.json").expect_err("no type");
        assert!(err.message().contains("a.json"));
        assert_eq!(err.exit_code(), 2);
    }
}
