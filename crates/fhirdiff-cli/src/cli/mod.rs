//! Clap CLI definition: root struct, subcommands, and shared argument types.
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// A CLI argument that is either a filesystem path or the stdin sentinel `"-"`.
///
/// Parsing `"-"` yields [`PathOrStdin::Stdin`]; anything else yields
/// [`PathOrStdin::Path`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathOrStdin {
    /// Read from standard input.
    Stdin,
    /// Read from the given filesystem path.
    Path(PathBuf),
}

impl std::str::FromStr for PathOrStdin {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "-" {
            Ok(PathOrStdin::Stdin)
        } else {
            Ok(PathOrStdin::Path(PathBuf::from(s)))
        }
    }
}

/// Output format for CLI commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text table (default).
    Human,
    /// A single JSON document.
    Json,
    /// Comma-separated rows with a header.
    Csv,
}

/// All top-level subcommands exposed by the `fhirdiff` binary.
#[derive(Subcommand)]
pub enum Command {
    /// Compare a predicted record against a reference record.
    Diff {
        /// Reference record, or `-` for stdin.
        #[arg(value_name = "TRUE")]
        true_file: PathOrStdin,
        /// Predicted record (cannot be `-` if TRUE is `-`).
        #[arg(value_name = "PRED")]
        pred_file: PathOrStdin,
        /// Type to compare under (default: the reference's resourceType).
        #[arg(long = "type", value_name = "TYPE")]
        type_name: Option<String>,
        /// Exit with code 1 if root accuracy is below this value.
        #[arg(long, value_name = "F")]
        fail_below: Option<f64>,
    },

    /// Emit treemap entries for a comparison as JSON.
    Treemap {
        /// Reference record, or `-` for stdin.
        #[arg(value_name = "TRUE")]
        true_file: PathOrStdin,
        /// Predicted record (cannot be `-` if TRUE is `-`).
        #[arg(value_name = "PRED")]
        pred_file: PathOrStdin,
        /// Type to compare under (default: the reference's resourceType).
        #[arg(long = "type", value_name = "TYPE")]
        type_name: Option<String>,
    },

    /// Align and score two bundles resource by resource.
    Bundle {
        /// Reference bundle, or `-` for stdin.
        #[arg(value_name = "TRUE")]
        true_file: PathOrStdin,
        /// Predicted bundle (cannot be `-` if TRUE is `-`).
        #[arg(value_name = "PRED")]
        pred_file: PathOrStdin,
        /// Minimum accuracy for two resources to be paired.
        #[arg(long, value_name = "F")]
        min_similarity: Option<f64>,
    },

    /// Score every pair of an NDJSON file.
    ///
    /// Each line is `{"true": .., "pred": .., "type"?: ..}`.
    Batch {
        /// NDJSON file, or `-` for stdin.
        #[arg(value_name = "FILE")]
        file: PathOrStdin,
    },

    /// List the fields of a schema type.
    Schema {
        /// Type name, e.g. `Observation` or `HumanName`.
        #[arg(value_name = "TYPE")]
        type_name: String,
    },

    /// Check a resource, or every entry of a bundle, for structural validity.
    Validate {
        /// Resource or bundle file, or `-` for stdin.
        #[arg(value_name = "FILE")]
        file: PathOrStdin,
    },
}

/// Root CLI struct for the `fhirdiff` binary.
///
/// All global flags are defined here and marked `global = true` so that clap
/// propagates them to every subcommand.
#[derive(Parser)]
#[command(
    name = "fhirdiff",
    version,
    about = "Score predicted FHIR records against a reference",
    long_about = "Schema-driven tree diff of FHIR records.\n\
                  Compares predicted resources and bundles with a reference,\n\
                  reporting per-field, per-type and per-bundle accuracy."
)]
pub struct Cli {
    /// Active subcommand.
    #[command(subcommand)]
    pub command: Command,

    /// Output format: human (default), json or csv.
    #[arg(long, short = 'f', default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Suppress all stderr output except errors (incompatible with `--verbose`).
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log alignment decisions to stderr (incompatible with `--quiet`).
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Maximum input file size in bytes.
    ///
    /// Can also be set via the `FHIRDIFF_MAX_FILE_SIZE` environment variable.
    /// Default: 268435456 (256 MB).
    #[arg(
        long,
        global = true,
        env = "FHIRDIFF_MAX_FILE_SIZE",
        default_value = "268435456"
    )]
    pub max_file_size: u64,

    /// Disable ANSI color codes in log output.
    ///
    /// Also respects the `NO_COLOR` environment variable per
    /// <https://no-color.org>.
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// JSON file with comparison settings (`max_exact_array_len`,
    /// `datetime_prefix_len`, `ignored_keys`, `reference_keys`,
    /// `validate_resources`).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
