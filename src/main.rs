//! blocksig - Block-wise CRC32 File Signature Generator
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use blocksig::config::{CliArgs, SigConfig};
use blocksig::error::SignatureError;
use blocksig::pipeline::Coordinator;
use blocksig::progress::{print_header, print_summary, ProgressReporter};
use clap::Parser;
use std::process::ExitCode;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            // Diagnostics go to stdout: "Error: <cause>", or the bare
            // "Unknown error" when there is nothing to report.
            match e.downcast_ref::<SignatureError>() {
                Some(err) => println!("{}", err.cli_report()),
                None => println!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Help and version exit 0; any argument error exits 1, matching the
    // runtime failure code.
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e)
            if matches!(
                e.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            let _ = e.print();
            return Ok(());
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    setup_logging(args.verbose)?;

    let config = SigConfig::from_args(args).map_err(SignatureError::from)?;

    if config.verbose {
        print_header(
            &config.input_path.display().to_string(),
            &config.output_path.display().to_string(),
            config.block_size,
            config.worker_count,
        );
    }

    let show_progress = config.show_progress;
    let verbose = config.verbose;
    let coordinator = Coordinator::new(config);

    // First Ctrl-C aborts cooperatively; the second forces exit.
    let flags = coordinator.flags();
    let presses = Arc::new(AtomicU32::new(0));
    {
        let presses = Arc::clone(&presses);
        ctrlc::set_handler(move || {
            if presses.fetch_add(1, Ordering::SeqCst) == 0 {
                eprintln!("\nInterrupt received, shutting down gracefully...");
                eprintln!("Press Ctrl+C again to force exit immediately.");
                flags.abort();
            } else {
                eprintln!("\nForced exit!");
                std::process::exit(130);
            }
        })
        .context("Failed to set signal handler")?;
    }

    let progress = show_progress.then(|| ProgressReporter::spawn(coordinator.stats()));

    let result = coordinator.run();

    if let Some(reporter) = progress {
        reporter.finish();
    }

    let summary = result?;
    print_summary(&summary, verbose);

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("blocksig=info,warn")
    } else {
        EnvFilter::new("blocksig=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
