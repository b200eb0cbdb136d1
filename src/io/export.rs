//! Export the daily series, the cleaned dataset, and a JSON run summary.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::app::pipeline::RunOutput;
use crate::domain::{Anomaly, CleanDataset, CleanStats, DailyAggregate, SeriesStats};
use crate::error::PipelineError;
use crate::io::atomic::write_atomic;
use crate::narrative::Narrative;

/// Write one row per day: `date,total_sum,record_count,z_score,is_anomaly`.
pub fn write_daily_csv(path: &Path, daily: &[DailyAggregate], anomalies: &[Anomaly]) -> Result<(), PipelineError> {
    write_atomic(path, |tmp| write_daily_rows(tmp, daily, anomalies))?;
    tracing::info!(path = %path.display(), rows = daily.len(), "exported daily series");
    Ok(())
}

fn write_daily_rows(path: &Path, daily: &[DailyAggregate], anomalies: &[Anomaly]) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;

    writer
        .write_record(["date", "total_sum", "record_count", "z_score", "is_anomaly"])
        .map_err(|e| csv_error(path, e))?;

    for d in daily {
        let is_anomaly = anomalies.iter().any(|a| a.date == d.date);
        writer
            .write_record([
                d.date.to_string(),
                format!("{:.4}", d.total_sum),
                d.record_count.to_string(),
                d.z_score.map(|z| format!("{z:.6}")).unwrap_or_default(),
                is_anomaly.to_string(),
            ])
            .map_err(|e| csv_error(path, e))?;
    }

    writer.flush().map_err(|e| PipelineError::io(path, e))
}

/// Write the cleaned dataset with ISO dates.
///
/// Column order is `Date`, `Unit price`, `Total`, then the passthrough columns
/// in their original order.
pub fn write_clean_csv(path: &Path, dataset: &CleanDataset) -> Result<(), PipelineError> {
    write_atomic(path, |tmp| write_clean_rows(tmp, dataset))?;
    tracing::info!(path = %path.display(), rows = dataset.records.len(), "exported cleaned dataset");
    Ok(())
}

fn write_clean_rows(path: &Path, dataset: &CleanDataset) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;

    let mut header = vec!["Date".to_string(), "Unit price".to_string(), "Total".to_string()];
    header.extend(dataset.extra_headers.iter().cloned());
    writer.write_record(&header).map_err(|e| csv_error(path, e))?;

    for r in &dataset.records {
        let mut row = vec![r.date.to_string(), r.unit_price.to_string(), r.total.to_string()];
        row.extend(r.extra.iter().cloned());
        writer.write_record(&row).map_err(|e| csv_error(path, e))?;
    }

    writer.flush().map_err(|e| PipelineError::io(path, e))
}

/// JSON summary of a completed run.
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub tool: &'static str,
    pub input: String,
    pub threshold: f64,
    pub total_revenue: f64,
    pub cleaning: &'a CleanStats,
    pub series: &'a SeriesStats,
    pub daily: &'a [DailyAggregate],
    pub anomalies: &'a [Anomaly],
    pub narrative: &'a Narrative,
}

impl<'a> RunSummary<'a> {
    pub fn new(run: &'a RunOutput, narrative: &'a Narrative) -> Self {
        Self {
            tool: "sar",
            input: run.input.display().to_string(),
            threshold: run.threshold,
            total_revenue: run.clean.total_revenue(),
            cleaning: &run.clean.stats,
            series: &run.stats,
            daily: &run.daily,
            anomalies: &run.anomalies,
            narrative,
        }
    }
}

pub fn write_summary_json(path: &Path, summary: &RunSummary<'_>) -> Result<(), PipelineError> {
    write_atomic(path, |tmp| {
        let file = File::create(tmp).map_err(|e| PipelineError::io(tmp, e))?;
        serde_json::to_writer_pretty(file, summary).map_err(|e| PipelineError::io(tmp, std::io::Error::other(e)))
    })?;
    tracing::info!(path = %path.display(), "exported run summary");
    Ok(())
}

fn csv_error(path: &Path, err: csv::Error) -> PipelineError {
    PipelineError::io(path, std::io::Error::other(err))
}
