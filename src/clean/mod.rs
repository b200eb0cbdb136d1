//! Dataset cleaning.
//!
//! `clean` is a pure transformation `&Dataset -> CleanDataset`:
//!
//! 1. drop exact duplicate records (first occurrence wins)
//! 2. impute missing `unit_price` / `total` with the column median, computed
//!    over the deduplicated rows before anything is filtered
//! 3. drop records with `total <= 0`
//! 4. parse `date` (ISO `YYYY-MM-DD` or US `M/D/YYYY`)
//!
//! A final duplicate pass runs on the typed records, because imputation and
//! date normalization can make two distinct raw rows identical. That pass is
//! what makes `clean` idempotent.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};

use crate::domain::{CleanDataset, CleanStats, Dataset, DatePolicy, Record, SaleRecord};
use crate::error::PipelineError;
use crate::math::median;

/// Accepted date layouts, tried in order.
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Clean a raw dataset. The input is left untouched.
pub fn clean(dataset: &Dataset, policy: DatePolicy) -> Result<CleanDataset, PipelineError> {
    let mut stats = CleanStats {
        rows_in: dataset.records.len(),
        ..CleanStats::default()
    };

    // 1) Exact duplicates.
    let unique = dedup_records(&dataset.records);
    stats.duplicates_removed = dataset.records.len() - unique.len();

    // 2) Medians over present values, then impute.
    let unit_price_median = column_median(&unique, |r| r.unit_price, "Unit price")?;
    let total_median = column_median(&unique, |r| r.total, "Total")?;
    stats.unit_price_median = unit_price_median;
    stats.total_median = total_median;
    tracing::debug!(unit_price_median, total_median, "column medians");

    let mut filled = Vec::with_capacity(unique.len());
    for r in unique {
        if r.unit_price.is_none() {
            stats.unit_price_imputed += 1;
        }
        if r.total.is_none() {
            stats.total_imputed += 1;
        }
        filled.push((
            r,
            r.unit_price.unwrap_or(unit_price_median),
            r.total.unwrap_or(total_median),
        ));
    }

    // 3) Non-positive totals.
    let before = filled.len();
    filled.retain(|&(_, _, total)| total > 0.0);
    stats.non_positive_dropped = before - filled.len();

    // 4) Dates.
    let mut records = Vec::with_capacity(filled.len());
    for (r, unit_price, total) in filled {
        let date = match parse_sale_date(&r.date) {
            Some(d) => d,
            None => match policy {
                DatePolicy::Fail => {
                    return Err(PipelineError::MalformedDate {
                        line: r.line,
                        value: r.date.clone(),
                    });
                }
                DatePolicy::Skip => {
                    tracing::warn!(line = r.line, value = %r.date, "skipping record with unparseable date");
                    stats.malformed_dates_skipped += 1;
                    continue;
                }
            },
        };
        records.push(SaleRecord {
            date,
            unit_price,
            total,
            extra: r.extra.clone(),
        });
    }

    let before = records.len();
    let records = dedup_sales(records);
    stats.duplicates_removed += before - records.len();
    stats.rows_out = records.len();

    tracing::info!(
        rows_in = stats.rows_in,
        rows_out = stats.rows_out,
        duplicates = stats.duplicates_removed,
        imputed_unit_price = stats.unit_price_imputed,
        imputed_total = stats.total_imputed,
        non_positive = stats.non_positive_dropped,
        bad_dates = stats.malformed_dates_skipped,
        "cleaned dataset"
    );

    Ok(CleanDataset {
        extra_headers: dataset.extra_headers.clone(),
        records,
        stats,
    })
}

/// Parse a sales date in one of the accepted layouts.
///
/// Years below 1000 are rejected so that two-digit years (`1/5/19`) don't
/// silently land in the first century.
pub fn parse_sale_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .filter(|d| d.year() >= 1000)
}

fn dedup_records(records: &[Record]) -> Vec<&Record> {
    let mut seen = HashSet::with_capacity(records.len());
    records.iter().filter(|r| seen.insert(r.key())).collect()
}

fn dedup_sales(records: Vec<SaleRecord>) -> Vec<SaleRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records.into_iter().filter(|r| seen.insert(sale_key(r))).collect()
}

type SaleKey = (NaiveDate, u64, u64, Vec<String>);

fn sale_key(r: &SaleRecord) -> SaleKey {
    (r.date, r.unit_price.to_bits(), r.total.to_bits(), r.extra.clone())
}

fn column_median(
    records: &[&Record],
    value: impl Fn(&Record) -> Option<f64>,
    column: &'static str,
) -> Result<f64, PipelineError> {
    let present: Vec<f64> = records.iter().filter_map(|r| value(r)).collect();
    median(&present).ok_or(PipelineError::InsufficientData { column })
}
