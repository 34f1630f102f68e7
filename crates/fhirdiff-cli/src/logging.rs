//! stderr logging for the `fhirdiff` binary.
use std::io::{self, IsTerminal as _};

use tracing_subscriber::{EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Directive used when `RUST_LOG` is not set.
pub fn default_directive(quiet: bool, verbose: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "warn,fhirdiff_core=debug,fhirdiff=debug"
    } else {
        "warn"
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the level flags.
pub fn init_logging(quiet: bool, verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(quiet, verbose)));

    let use_ansi =
        !no_color && std::env::var_os("NO_COLOR").is_none() && io::stderr().is_terminal();

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(use_ansi)
        .without_time()
        .with_target(verbose)
        .with_level(true)
        .with_filter(filter);

    // A subscriber may already be set when running under a test harness.
    if tracing_subscriber::registry()
        .with(console_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("logging already initialised");
    }
}
