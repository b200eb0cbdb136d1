//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads, cleans, and scores the sales data
//! - asks the narrative service for a summary (or falls back)
//! - prints the summary/plot and writes the report and optional exports

use clap::Parser;

use crate::cli::{Command, InputArgs, RunArgs};
use crate::domain::PipelineConfig;
use crate::error::AppError;
use crate::narrative::{GeminiNarrator, NarrativeConfig, NarrativeService};

pub mod pipeline;

/// Entry point for the `sar` binary.
pub fn run() -> Result<(), AppError> {
    // `sar` and `sar -i data.csv` behave like `sar run ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Tui(args) => handle_tui(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    crate::logging::init(if args.verbose { "debug" } else { "info" });

    let config = run_config_from_args(&args);

    let narrator = if args.offline {
        tracing::info!("offline mode; narrative service disabled");
        None
    } else {
        let mut narrative_config = NarrativeConfig::from_env();
        if let Some(model) = &args.model {
            narrative_config.model = model.clone();
        }
        if let Some(secs) = args.timeout_secs {
            narrative_config.timeout_secs = secs;
        }
        GeminiNarrator::from_config(&narrative_config)?
    };

    let (run, narrative) = pipeline::run_pipeline(&config, narrator.as_ref().map(|n| n as &dyn NarrativeService))?;

    println!("{}", crate::report::format_run_summary(&run));

    if config.plot {
        let plot = crate::plot::render_daily_plot(&run.daily, &run.anomalies, config.plot_width, config.plot_height);
        println!("{plot}");
    }

    if narrative.is_fallback() {
        println!("Narrative: fallback text used");
    }
    println!("Report: {}", config.report.display());

    Ok(())
}

fn handle_tui(args: InputArgs) -> Result<(), AppError> {
    // Log lines would tear the alternate screen; keep them off unless RUST_LOG asks.
    crate::logging::init("off");
    crate::tui::run(config_from_input(&args))
}

pub fn run_config_from_args(args: &RunArgs) -> PipelineConfig {
    PipelineConfig {
        report: args.report.clone(),
        export_daily: args.export_daily.clone(),
        export_clean: args.export_clean.clone(),
        export_json: args.export_json.clone(),
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        ..config_from_input(&args.input)
    }
}

fn config_from_input(args: &InputArgs) -> PipelineConfig {
    PipelineConfig {
        input: args.input.clone(),
        threshold: args.threshold,
        date_policy: args.on_bad_date,
        ..PipelineConfig::default()
    }
}

/// Rewrite argv so `sar` defaults to `sar run`.
///
/// Rules:
/// - `sar`                      -> `sar run`
/// - `sar -i data.csv ...`      -> `sar run -i data.csv ...`
/// - `sar --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "run flags".
    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
        return argv;
    }

    argv
}
