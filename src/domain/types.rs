//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - passed between stages by value
//! - exported to JSON/CSV
//! - rendered into the report and the TUI

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Default `|z|` threshold above which a day is reported as an anomaly.
pub const DEFAULT_THRESHOLD: f64 = 2.5;

/// What to do with a record whose `Date` cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DatePolicy {
    /// Abort the run with a malformed-date error naming the line.
    #[default]
    Fail,
    /// Drop the record, count it in the cleaning stats, and log a warning.
    Skip,
}

/// One sales transaction as loaded from the input file.
///
/// `unit_price` / `total` are `None` when the cell is empty or does not parse
/// as a finite number. `extra` holds the passthrough columns, aligned with
/// [`Dataset::extra_headers`].
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// 1-based line number in the source file (diagnostics only, not part of
    /// record identity).
    pub line: usize,
    pub date: String,
    pub unit_price: Option<f64>,
    pub total: Option<f64>,
    pub extra: Vec<String>,
}

/// Field-wise identity of a [`Record`], used for duplicate detection.
///
/// Numbers compare by their parsed value (`1.50` == `1.5`), text compares
/// exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    date: String,
    unit_price: Option<u64>,
    total: Option<u64>,
    extra: Vec<String>,
}

impl Record {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            date: self.date.clone(),
            unit_price: self.unit_price.map(f64::to_bits),
            total: self.total.map(f64::to_bits),
            extra: self.extra.clone(),
        }
    }
}

/// Raw dataset: ordered records plus the header layout they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Header names of the passthrough columns, in file order.
    pub extra_headers: Vec<String>,
    pub records: Vec<Record>,
}

/// A record after cleaning: typed date, no missing numbers, `total > 0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleRecord {
    pub date: NaiveDate,
    pub unit_price: f64,
    pub total: f64,
    pub extra: Vec<String>,
}

/// What the cleaning stage did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanStats {
    pub rows_in: usize,
    pub duplicates_removed: usize,
    pub unit_price_imputed: usize,
    pub total_imputed: usize,
    pub unit_price_median: f64,
    pub total_median: f64,
    pub non_positive_dropped: usize,
    pub malformed_dates_skipped: usize,
    pub rows_out: usize,
}

impl CleanStats {
    /// Number of input rows that did not survive cleaning.
    pub fn rows_removed(&self) -> usize {
        self.rows_in.saturating_sub(self.rows_out)
    }
}

/// Output of the cleaning stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanDataset {
    pub extra_headers: Vec<String>,
    pub records: Vec<SaleRecord>,
    pub stats: CleanStats,
}

impl CleanDataset {
    /// Sum of `total` over all cleaned records.
    pub fn total_revenue(&self) -> f64 {
        self.records.iter().map(|r| r.total).sum()
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.records.iter().map(|r| r.date).min()?;
        let last = self.records.iter().map(|r| r.date).max()?;
        Some((first, last))
    }
}

impl From<&CleanDataset> for Dataset {
    /// Turn a cleaned dataset back into raw form (ISO dates) so it can be fed
    /// through the cleaner again.
    fn from(clean: &CleanDataset) -> Self {
        let records = clean
            .records
            .iter()
            .enumerate()
            .map(|(idx, r)| Record {
                line: idx + 2,
                date: r.date.format("%Y-%m-%d").to_string(),
                unit_price: Some(r.unit_price),
                total: Some(r.total),
                extra: r.extra.clone(),
            })
            .collect();
        Dataset {
            extra_headers: clean.extra_headers.clone(),
            records,
        }
    }
}

/// Sum of totals for one calendar date, plus its z-score once computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub total_sum: f64,
    pub record_count: usize,
    pub z_score: Option<f64>,
}

/// Population statistics of the daily series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStats {
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
}

/// A day whose `|z_score|` exceeded the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub date: NaiveDate,
    pub total_sum: f64,
    pub z_score: f64,
}

impl Anomaly {
    /// Promote a scored aggregate; `None` if it has no z-score yet.
    pub fn from_aggregate(day: &DailyAggregate) -> Option<Self> {
        Some(Self {
            date: day.date,
            total_sum: day.total_sum,
            z_score: day.z_score?,
        })
    }
}

/// Run configuration.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub report: PathBuf,
    pub threshold: f64,
    pub date_policy: DatePolicy,

    pub export_daily: Option<PathBuf>,
    pub export_clean: Option<PathBuf>,
    pub export_json: Option<PathBuf>,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("dirty_sales_data.csv"),
            report: PathBuf::from("Final_Report.md"),
            threshold: DEFAULT_THRESHOLD,
            date_policy: DatePolicy::Fail,
            export_daily: None,
            export_clean: None,
            export_json: None,
            plot: true,
            plot_width: 72,
            plot_height: 14,
        }
    }
}
