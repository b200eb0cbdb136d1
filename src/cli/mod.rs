//! Command-line parsing for the sales anomaly reporter.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! cleaning/detection code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_THRESHOLD, DatePolicy};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "sar", version, about = "Sales data cleaning, z-score anomaly detection, and reporting")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Clean the input, detect anomalous days, and write the report.
    Run(RunArgs),
    /// Explore the daily series and anomalies interactively.
    ///
    /// This uses the same analysis pipeline as `sar run` but does not call the
    /// narrative service or write any files.
    Tui(InputArgs),
}

/// Input and detection options shared by all commands.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Sales CSV with at least `Date`, `Unit price`, and `Total` columns.
    #[arg(short = 'i', long, default_value = "dirty_sales_data.csv")]
    pub input: PathBuf,

    /// Flag days whose |z-score| is strictly greater than this.
    #[arg(short = 't', long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// What to do with rows whose date can't be parsed.
    #[arg(long = "on-bad-date", value_enum, default_value_t = DatePolicy::Fail)]
    pub on_bad_date: DatePolicy,
}

/// Options for a full run.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Where to write the Markdown report.
    #[arg(short = 'o', long, default_value = "Final_Report.md")]
    pub report: PathBuf,

    /// Export the daily series (with z-scores) to CSV.
    #[arg(long = "export-daily")]
    pub export_daily: Option<PathBuf>,

    /// Export the cleaned dataset to CSV.
    #[arg(long = "export-clean")]
    pub export_clean: Option<PathBuf>,

    /// Export a JSON summary of the run.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,

    /// Skip the narrative service and use the fallback text.
    #[arg(long)]
    pub offline: bool,

    /// Narrative model name (overrides GEMINI_MODEL).
    #[arg(long)]
    pub model: Option<String>,

    /// Narrative request timeout in seconds (overrides GEMINI_TIMEOUT_SECS).
    #[arg(long = "timeout-secs", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,

    /// Render an ASCII chart of daily totals (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the chart in the terminal and the report.
    #[arg(long)]
    pub no_plot: bool,

    /// Chart width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Chart height (rows).
    #[arg(long, default_value_t = 14)]
    pub height: usize,

    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
