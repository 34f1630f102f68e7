use std::process::ExitCode;

use clap::Parser;
use fhirdiff_core::SchemaRegistry;

mod cli;
mod cmd;
mod error;
mod format;
mod io;
mod logging;

pub use cli::{Cli, Command, OutputFormat, PathOrStdin};

use crate::cmd::Context;
use crate::error::CliError;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.quiet, cli.verbose, cli.no_color);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            eprintln!("{}", err.message());
            ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(2))
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = io::load_config(cli.config.as_deref(), cli.max_file_size)?;
    let ctx = Context {
        format: cli.format,
        max_file_size: cli.max_file_size,
        config,
    };
    let schema = SchemaRegistry::fhir_r4b()?;

    match &cli.command {
        Command::Diff {
            true_file,
            pred_file,
            type_name,
            fail_below,
        } => {
            let (t, p) = read_pair(&ctx, true_file, pred_file)?;
            cmd::diff::run(
                &ctx,
                &schema,
                &t,
                &p,
                &io::source_label(true_file),
                type_name.as_deref(),
                *fail_below,
            )
        }
        Command::Treemap {
            true_file,
            pred_file,
            type_name,
        } => {
            let (t, p) = read_pair(&ctx, true_file, pred_file)?;
            cmd::treemap::run(
                &ctx,
                &schema,
                &t,
                &p,
                &io::source_label(true_file),
                type_name.as_deref(),
            )
        }
        Command::Bundle {
            true_file,
            pred_file,
            min_similarity,
        } => {
            let (t, p) = read_pair(&ctx, true_file, pred_file)?;
            cmd::bundle::run(&ctx, &schema, &t, &p, *min_similarity)
        }
        Command::Batch { file } => {
            let pairs = io::read_pairs(file, ctx.max_file_size)?;
            cmd::batch::run(&ctx, &schema, pairs)
        }
        Command::Schema { type_name } => cmd::schema::run(&ctx, &schema, type_name),
        Command::Validate { file } => {
            let value = io::read_json(file, ctx.max_file_size)?;
            cmd::validate::run(&ctx, &schema, &value)
        }
    }
}

fn read_pair(
    ctx: &Context,
    true_file: &PathOrStdin,
    pred_file: &PathOrStdin,
) -> Result<(serde_json::Value, serde_json::Value), CliError> {
    io::ensure_single_stdin(&[true_file, pred_file])?;
    let t = io::read_json(true_file, ctx.max_file_size)?;
    let p = io::read_json(pred_file, ctx.max_file_size)?;
    Ok((t, p))
}
