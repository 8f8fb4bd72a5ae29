//! RagOps CLI: quality gates for a RAG chatbot.
//!
//! `compare` is the CI gate: it exits `0` when no tracked metric regressed
//! against the baseline and `1` on any regression or configuration error.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// RagOps: evaluation and regression gating for a RAG chatbot
#[derive(Parser, Debug)]
#[command(name = "ragops", version, about, long_about = None)]
pub(crate) struct Cli {
    /// Workspace directory (searched for ragops.toml)
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Commands {
    /// Compare a current report against the baseline (CI quality gate)
    Compare {
        /// Baseline report (defaults to gate.baseline_path)
        baseline: Option<PathBuf>,
        /// Current report (defaults to gate.current_path)
        current: Option<PathBuf>,
        /// Maximum allowed drop from baseline
        #[arg(short, long, alias = "threshold")]
        tolerance: Option<f64>,
        /// Absolute floor as metric=value, checked regardless of baseline
        #[arg(long = "floor", value_name = "METRIC=VALUE")]
        floors: Vec<String>,
        /// Print the outcome as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Promote a validated current report to the baseline
    Promote {
        /// Current report (defaults to gate.current_path)
        current: Option<PathBuf>,
        /// Baseline to overwrite (defaults to gate.baseline_path)
        baseline: Option<PathBuf>,
    },
    /// Run the golden dataset through the RAG service and the judge
    Evaluate {
        /// Golden dataset path
        #[arg(long)]
        dataset: Option<PathBuf>,
        /// Where to write the evaluation report
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Judge model name
        #[arg(long)]
        judge_model: Option<String>,
        /// RAG service endpoint to query for answers
        #[arg(long, conflicts_with = "answers")]
        generator_url: Option<String>,
        /// Pre-recorded answers file
        #[arg(long)]
        answers: Option<PathBuf>,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum ConfigAction {
    /// Print the resolved configuration as TOML
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging.
    // stderr stays quiet by default so the gate verdict on stdout is the
    // only thing a CI log shows.
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "ragops", "ragops")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "ragops.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    match commands::handle_command(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            println!("❌ {}: {e:#}", commands::failure_heading(&e));
            println!("   The pipeline is broken; this is not a quality verdict.");
            ExitCode::FAILURE
        }
    }
}
