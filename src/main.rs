//! pdfsplice - Assemble a PDF from page ranges of other PDFs.
//!
//! The merge runs on a blocking worker; its progress trace is forwarded
//! to the console over a channel.

mod cli;

use anyhow::Context;
use clap::Parser;
use std::process;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;
use pdfsplice::error::{MergeFailure, PdfSpliceError};
use pdfsplice::merge::Merger;
use pdfsplice::output::{OutputFormatter, display_merge_report};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let formatter = OutputFormatter::new(cli.quiet, cli.verbose);
    if let Err(err) = run(cli, &formatter).await {
        formatter.error(&format!("{err:#}"));
        process::exit(exit_code(&err));
    }
}

/// Install the stderr log subscriber; `RUST_LOG` wins over the flags.
fn init_tracing(quiet: bool, verbose: bool) {
    let default_level = if verbose {
        "pdfsplice=debug"
    } else if quiet {
        "pdfsplice=error"
    } else {
        "pdfsplice=warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Main application logic.
async fn run(cli: Cli, formatter: &OutputFormatter) -> anyhow::Result<()> {
    let job = cli.to_job()?;
    let options = cli.merge_options();
    let mode = cli.on_bookmark_error;
    let total = job.instructions.len();

    formatter.info(&format!(
        "Merging {total} instruction(s) into {}",
        job.output.display()
    ));

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let worker = tokio::task::spawn_blocking(move || {
        let mut sink = tx;
        let mut handler = mode.handler();
        Merger::new(options).run(&job, Some(&mut sink), handler.as_mut())
    });

    let mut step = 0;
    while let Some(descriptor) = rx.recv().await {
        step += 1;
        formatter.step(step, total, &descriptor);
    }

    let report = worker.await.context("Merge worker stopped unexpectedly")??;
    display_merge_report(formatter, &report);

    Ok(())
}

/// Process exit code for a failed run.
fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(failure) = err.downcast_ref::<MergeFailure>() {
        return failure.error.exit_code();
    }
    err.downcast_ref::<PdfSpliceError>()
        .map_or(1, PdfSpliceError::exit_code)
}
