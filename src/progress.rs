//! Progress reporting for the signature pipeline
//!
//! A sampling thread polls the pipeline's shared counters every 100 ms
//! and feeds an indicatif spinner on stderr. The summary line mandated by
//! the CLI contract (`Done, time: <seconds> sec`) goes to stdout.

use crate::pipeline::{PipelineStats, SignatureSummary};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Sampling interval for the spinner
const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Progress reporter that displays pipeline throughput
pub struct ProgressReporter {
    bar: ProgressBar,
    stop: Arc<AtomicBool>,
    sampler: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    /// Start a spinner fed by the pipeline counters
    pub fn spawn(stats: Arc<PipelineStats>) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("Invalid progress template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        bar.enable_steady_tick(SAMPLE_INTERVAL);

        let stop = Arc::new(AtomicBool::new(false));
        let sampler = {
            let bar = bar.clone();
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    let total = stats.total_blocks();
                    bar.set_message(format!(
                        "Blocks: {}/{} read | {} hashed | {} written",
                        format_number(stats.blocks_read()),
                        format_number(total),
                        format_number(stats.blocks_hashed()),
                        format_number(stats.blocks_written()),
                    ));
                    thread::sleep(SAMPLE_INTERVAL);
                }
            })
        };

        Self {
            bar,
            stop,
            sampler: Some(sampler),
        }
    }

    /// Stop sampling and clear the spinner
    pub fn finish(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.sampler.take() {
            let _ = handle.join();
        }
        self.bar.finish_and_clear();
    }
}

/// Print a header at the start of a run (verbose mode)
pub fn print_header(input: &str, output: &str, block_size: u64, workers: usize) {
    eprintln!();
    eprintln!(
        "{} {}",
        style("blocksig").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Input:").bold(), input);
    eprintln!("  {} {}", style("Output:").bold(), output);
    eprintln!(
        "  {} {}",
        style("Block size:").bold(),
        format_size(block_size, BINARY)
    );
    eprintln!("  {} {}", style("Workers:").bold(), workers);
    eprintln!();
}

/// Print the completion summary
///
/// The `Done, time` line is the CLI contract and always goes to stdout;
/// the throughput detail is stderr-only decoration.
pub fn print_summary(summary: &SignatureSummary, verbose: bool) {
    let secs = summary.duration.as_secs_f64();

    if verbose {
        let rate = if secs > 0.0 {
            summary.bytes as f64 / secs
        } else {
            0.0
        };
        eprintln!(
            "  {} {} in {} blocks ({}/s)",
            style("Signed:").bold(),
            format_size(summary.bytes, BINARY),
            format_number(summary.blocks),
            format_size(rate as u64, BINARY),
        );
    }

    println!("Done, time: {:.3} sec", secs);
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}
