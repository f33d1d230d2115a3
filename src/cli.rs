//! Command-line plumbing shared by the `mbox-extract` and `mbox-text` binaries.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config;
use crate::export::OutputFormat;
use crate::extract;
use crate::model::record::ExtractSummary;

/// Flags accepted by both binaries.
#[derive(Args, Debug, Default)]
pub struct CommonArgs {
    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Hide the progress bar and the closing summary
    #[arg(short, long)]
    pub quiet: bool,

    /// TOML configuration file. `[extract] chunk_size` there replaces the
    /// 150 messages per output file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Load configuration, set up logging, and export `mbox_path` in `format`.
pub fn run(
    mbox_path: &Path,
    output_path: &Path,
    format: OutputFormat,
    common: &CommonArgs,
) -> anyhow::Result<()> {
    let config = config::load_config(common.config.as_deref())?;

    let log_level = match common.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level);

    let show_progress = config.extract.progress && !common.quiet;
    let pb = if show_progress {
        ProgressBar::new(0)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} Extracting [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let summary = extract::export_mbox(
        mbox_path,
        output_path,
        format,
        &config.extract,
        Some(&|current, total| {
            pb.set_length(total);
            pb.set_position(current);
        }),
    );
    pb.finish_and_clear();
    let summary = summary?;

    if show_progress {
        print_summary(&summary, format, start.elapsed());
    }
    Ok(())
}

/// Set up tracing on stderr at the given level.
///
/// The level comes from the configuration file or `-v` flags only;
/// `RUST_LOG` is ignored.
pub fn setup_logging(level: &str) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // A second initialization (e.g. in tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init();
}

/// Print a human-readable report of a finished run.
fn print_summary(summary: &ExtractSummary, format: OutputFormat, elapsed: Duration) {
    println!();
    println!("  {:<20} {}", "Messages", summary.messages);
    println!("  {:<20} {}", "Format", format);
    println!("  {:<20} {}", "Files", summary.files.len());
    println!(
        "  {:<20} {}",
        "Output size",
        format_size(summary.bytes_written, BINARY)
    );
    println!("  {:<20} {:.2?}", "Elapsed", elapsed);
    for path in &summary.files {
        println!("    {}", path.display());
    }
    println!();
}
