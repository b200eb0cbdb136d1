//! Markdown report writer.

use std::fs;
use std::path::Path;

use super::ReportInput;
use super::format::fmt_money;
use crate::error::PipelineError;
use crate::io::write_atomic;
use crate::narrative::NarrativeSource;
use crate::plot::render_daily_plot;

pub const REPORT_TITLE: &str = "Automated Sales Anomaly Report";

/// Render the report and persist it at `path`.
///
/// The document is written to a sibling temp file and renamed into place, so
/// a failed write never leaves a truncated report behind.
pub fn write_markdown_report(path: &Path, input: &ReportInput<'_>) -> Result<(), PipelineError> {
    let doc = render_markdown(input);

    write_atomic(path, |tmp| fs::write(tmp, doc).map_err(|e| PipelineError::io(tmp, e)))?;

    tracing::info!(path = %path.display(), "wrote report");
    Ok(())
}

/// Render the full Markdown document.
pub fn render_markdown(input: &ReportInput<'_>) -> String {
    let mut out = String::new();
    let clean = &input.dataset.stats;

    out.push_str(&format!("# {REPORT_TITLE}\n\n"));
    out.push_str(&format!(
        "Total Revenue Processed: **{}**\n\n",
        fmt_money(input.dataset.total_revenue())
    ));
    out.push_str(&format!("- Records after cleaning: {}\n", input.dataset.records.len()));
    if let Some((first, last)) = input.dataset.date_range() {
        out.push_str(&format!("- Period: {first} to {last} ({} days with sales)\n", input.daily.len()));
    }
    out.push_str(&format!(
        "- Daily revenue: mean {} / std-dev {} (population)\n\n",
        fmt_money(input.stats.mean),
        fmt_money(input.stats.std_dev)
    ));

    match &input.narrative.source {
        NarrativeSource::Service { label } => {
            out.push_str(&format!("## AI Executive Summary ({label})\n\n"));
        }
        NarrativeSource::Fallback { reason } => {
            out.push_str("## Executive Summary\n\n");
            out.push_str(&format!(
                "> Note: the narrative service was unavailable ({reason}); standard fallback text is shown.\n\n"
            ));
        }
    }
    out.push_str(sanitize_narrative(&input.narrative.text).trim());
    out.push_str("\n\n");

    out.push_str(&format!("## Detected Anomalies (|Z-Score| > {})\n\n", input.threshold));
    if input.anomalies.is_empty() {
        out.push_str("No day exceeded the threshold.\n\n");
    } else {
        out.push_str("| Date | Total Sales ($) | Z-Score |\n");
        out.push_str("|------|---------------:|--------:|\n");
        for a in input.anomalies {
            out.push_str(&format!("| {} | {:.2} | {:.2} |\n", a.date, a.total_sum, a.z_score));
        }
        out.push('\n');
    }

    out.push_str("## Data Cleaning\n\n");
    out.push_str("| Step | Rows |\n");
    out.push_str("|------|-----:|\n");
    out.push_str(&format!("| Rows read | {} |\n", clean.rows_in));
    out.push_str(&format!("| Duplicates removed | {} |\n", clean.duplicates_removed));
    out.push_str(&format!(
        "| Unit price imputed (median {:.2}) | {} |\n",
        clean.unit_price_median, clean.unit_price_imputed
    ));
    out.push_str(&format!(
        "| Total imputed (median {:.2}) | {} |\n",
        clean.total_median, clean.total_imputed
    ));
    out.push_str(&format!("| Non-positive totals dropped | {} |\n", clean.non_positive_dropped));
    if clean.malformed_dates_skipped > 0 {
        out.push_str(&format!("| Unparseable dates skipped | {} |\n", clean.malformed_dates_skipped));
    }
    out.push_str(&format!("| Rows kept | {} |\n", clean.rows_out));

    if let Some((width, height)) = input.plot {
        out.push_str("\n## Daily Revenue\n\n```text\n");
        out.push_str(&render_daily_plot(input.daily, input.anomalies, width, height));
        out.push_str("```\n");
    }

    out
}

/// Strip the emphasis/heading markers generated text tends to include, so it
/// can't break the report's own structure.
fn sanitize_narrative(text: &str) -> String {
    text.replace("**", "").replace('#', "")
}
