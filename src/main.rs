use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fuzzy_lib::matching::manager::start_job;
use fuzzy_lib::utils::env::load_env;
use fuzzy_lib::utils::get_memory_usage;
use fuzzy_lib::utils::progress_bars::logging::log_job_summary;
use fuzzy_lib::utils::progress_bars::progress_config::ProgressConfig;
use fuzzy_lib::utils::run_config::{JobConfig, DEFAULT_LOG_FILE, DEFAULT_OUTPUT_FILE};
use log::{info, warn};

/// Prints the fuzzy matches found in two CSV files.
///
/// The AUTHOR and TITLE columns of both files are compared. Header names must
/// not carry surrounding spaces. Results are written to the output file, which
/// is overwritten if it already exists.
#[derive(Parser, Debug)]
#[command(name = "fuzzy_match", version, about, long_about = None)]
struct Args {
    /// Path to Goodreads data CSV file
    #[arg(short = 'g', long = "gr-data")]
    gr_data: PathBuf,

    /// Path to library CSV file to scan
    #[arg(short = 'l', long = "lib-data")]
    lib_data: PathBuf,

    /// Matching threshold 0 - 100; a score must be strictly above it
    #[arg(short = 'm', long = "match-score", allow_negative_numbers = true)]
    match_score: i64,

    /// Columns used for a match: T (title), A (author), TA (title plus author), TTA (title or title+author)
    #[arg(short = 'c', long = "columns")]
    columns: String,

    /// Output CSV path
    #[arg(short = 'o', long = "output", default_value = DEFAULT_OUTPUT_FILE)]
    output: PathBuf,

    /// Run log path
    #[arg(long = "log-file", default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Worker count, overrides FUZZY_WORKER_COUNT
    #[arg(long)]
    workers: Option<usize>,

    /// File that exists while the job runs
    #[arg(long)]
    marker: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    info!("Starting fuzzy book matching");
    load_env();

    let args = Args::parse();

    let progress_config = ProgressConfig::from_env();
    info!(
        "Progress tracking: enabled={}, show_memory={}",
        progress_config.enabled, progress_config.show_memory
    );
    let multi_progress = progress_config.create_multi_progress();

    let mut config = JobConfig::new(&args.gr_data, &args.lib_data, args.match_score, &args.columns)
        .context("Invalid job configuration")?;
    config.output_path = args.output;
    config.log_path = args.log_file;
    config.marker_path = args.marker;
    if let Some(workers) = args.workers {
        config.engine = config.engine.with_workers(workers);
    }
    config.log_config();

    match start_job(&config, multi_progress.as_ref()).await {
        Some(summary) => {
            let memory_mb = if progress_config.should_show_memory() {
                get_memory_usage().await
            } else {
                None
            };
            log_job_summary(&summary, memory_mb);
        }
        None => warn!(
            "Job did not complete; see {} for details",
            config.log_path.display()
        ),
    }

    Ok(())
}
