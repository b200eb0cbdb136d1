//! Reporting: terminal summaries and the persisted Markdown report.

use crate::domain::{Anomaly, CleanDataset, DailyAggregate, SeriesStats};
use crate::narrative::Narrative;

pub mod format;
pub mod markdown;

pub use format::*;
pub use markdown::*;

/// Everything the report is assembled from.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub dataset: &'a CleanDataset,
    pub daily: &'a [DailyAggregate],
    pub stats: &'a SeriesStats,
    pub anomalies: &'a [Anomaly],
    pub narrative: &'a Narrative,
    pub threshold: f64,
    /// Chart size (columns, rows); `None` omits the chart.
    pub plot: Option<(usize, usize)>,
}
