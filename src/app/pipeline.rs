//! Shared pipeline logic used by both the CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load -> clean -> aggregate by day -> z-scores -> detect
//!
//! `run_pipeline` adds the narrative and the persisted outputs on top.

use std::path::PathBuf;

use crate::clean::clean;
use crate::detect::{aggregate_by_day, compute_zscores, detect, validate_threshold};
use crate::domain::{Anomaly, CleanDataset, DailyAggregate, PipelineConfig, SeriesStats};
use crate::error::PipelineError;
use crate::io::export::{RunSummary, write_clean_csv, write_daily_csv, write_summary_json};
use crate::io::ingest::load;
use crate::narrative::{Narrative, NarrativeService, resolve_narrative};
use crate::report::{ReportInput, write_markdown_report};

/// All computed outputs of a single analysis run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub input: PathBuf,
    pub threshold: f64,
    pub clean: CleanDataset,
    pub daily: Vec<DailyAggregate>,
    pub stats: SeriesStats,
    pub anomalies: Vec<Anomaly>,
}

impl RunOutput {
    /// Re-run only the threshold filter over the already scored series.
    pub fn with_threshold(&self, threshold: f64) -> Result<RunOutput, PipelineError> {
        let threshold = validate_threshold(threshold)?;
        Ok(RunOutput {
            threshold,
            anomalies: detect(&self.daily, threshold),
            ..self.clone()
        })
    }
}

/// Load, clean, and score the input; no side effects besides reading it.
pub fn run_analysis(config: &PipelineConfig) -> Result<RunOutput, PipelineError> {
    let threshold = validate_threshold(config.threshold)?;

    // 1) Load + clean.
    let dataset = load(&config.input)?;
    let clean = clean(&dataset, config.date_policy)?;

    // 2) Aggregate and score.
    let daily = aggregate_by_day(&clean);
    let (daily, stats) = compute_zscores(daily)?;

    // 3) Threshold.
    let anomalies = detect(&daily, threshold);
    tracing::info!(days = daily.len(), anomalies = anomalies.len(), threshold, "detected anomalies");
    for a in &anomalies {
        tracing::debug!(date = %a.date, total_sum = a.total_sum, z_score = a.z_score, "anomaly");
    }

    Ok(RunOutput {
        input: config.input.clone(),
        threshold,
        clean,
        daily,
        stats,
        anomalies,
    })
}

/// Full run: analysis, narrative (never fatal), optional exports, report.
///
/// Nothing is written unless every analysis stage succeeded, and each file is
/// replaced atomically.
pub fn run_pipeline(
    config: &PipelineConfig,
    narrator: Option<&dyn NarrativeService>,
) -> Result<(RunOutput, Narrative), PipelineError> {
    let run = run_analysis(config)?;
    let narrative = resolve_narrative(narrator, &run.anomalies);

    // Exports first: an existing report means every output was written.
    if let Some(path) = &config.export_daily {
        write_daily_csv(path, &run.daily, &run.anomalies)?;
    }
    if let Some(path) = &config.export_clean {
        write_clean_csv(path, &run.clean)?;
    }
    if let Some(path) = &config.export_json {
        write_summary_json(path, &RunSummary::new(&run, &narrative))?;
    }

    let input = ReportInput {
        dataset: &run.clean,
        daily: &run.daily,
        stats: &run.stats,
        anomalies: &run.anomalies,
        narrative: &narrative,
        threshold: run.threshold,
        plot: config.plot.then_some((config.plot_width, config.plot_height)),
    };
    write_markdown_report(&config.report, &input)?;

    Ok((run, narrative))
}
