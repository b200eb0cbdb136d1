//! Daily aggregation and z-score anomaly detection.
//!
//! Model:
//! - Sum `total` per calendar date (ascending by date).
//! - Score every day with a population z-score over the whole daily series.
//! - Flag days with `|z| > threshold`.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{Anomaly, CleanDataset, DailyAggregate, SeriesStats};
use crate::error::PipelineError;
use crate::math::{mean, population_std_dev};

/// Relative tolerance under which the series spread is treated as zero.
///
/// Scaled by the largest |daily total|, so series of tiny but distinct values
/// still score.
const ZERO_SPREAD_REL: f64 = 1e-12;

/// Group cleaned records by date and sum their totals.
pub fn aggregate_by_day(dataset: &CleanDataset) -> Vec<DailyAggregate> {
    let mut by_day: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for r in &dataset.records {
        let entry = by_day.entry(r.date).or_insert((0.0, 0));
        entry.0 += r.total;
        entry.1 += 1;
    }

    by_day
        .into_iter()
        .map(|(date, (total_sum, record_count))| DailyAggregate {
            date,
            total_sum,
            record_count,
            z_score: None,
        })
        .collect()
}

/// Populate `z_score` on every entry using population mean / std-dev.
///
/// Fails with `DegenerateSeries` for fewer than two days or a constant series.
pub fn compute_zscores(
    daily: Vec<DailyAggregate>,
) -> Result<(Vec<DailyAggregate>, SeriesStats), PipelineError> {
    let n = daily.len();
    if n < 2 {
        return Err(PipelineError::DegenerateSeries {
            n,
            reason: "at least two distinct dates are required",
        });
    }

    let values: Vec<f64> = daily.iter().map(|d| d.total_sum).collect();
    let Some(mean) = mean(&values) else {
        return Err(PipelineError::DegenerateSeries {
            n,
            reason: "daily totals are not finite",
        });
    };

    let std_dev = population_std_dev(&values, mean).ok_or(PipelineError::DegenerateSeries {
        n,
        reason: "daily totals are not finite",
    })?;

    let scale = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if std_dev == 0.0 || std_dev <= ZERO_SPREAD_REL * scale {
        return Err(PipelineError::DegenerateSeries {
            n,
            reason: "all daily totals are equal (zero standard deviation)",
        });
    }

    let stats = SeriesStats { n, mean, std_dev };
    tracing::debug!(n, mean, std_dev, "daily series statistics");

    let scored = daily
        .into_iter()
        .map(|d| DailyAggregate {
            z_score: Some((d.total_sum - mean) / std_dev),
            ..d
        })
        .collect();

    Ok((scored, stats))
}

/// Days whose `|z_score|` is strictly greater than `threshold`, in date order.
pub fn detect(daily: &[DailyAggregate], threshold: f64) -> Vec<Anomaly> {
    daily
        .iter()
        .filter(|d| d.z_score.is_some_and(|z| z.abs() > threshold))
        .filter_map(Anomaly::from_aggregate)
        .collect()
}

/// Reject thresholds that cannot produce a meaningful filter.
pub fn validate_threshold(threshold: f64) -> Result<f64, PipelineError> {
    if threshold.is_finite() && threshold > 0.0 {
        Ok(threshold)
    } else {
        Err(PipelineError::Config(format!(
            "threshold must be a finite positive number (got {threshold})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CleanStats, SaleRecord};

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 1, n).unwrap()
    }

    fn series(values: &[f64]) -> Vec<DailyAggregate> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| DailyAggregate {
                date: day(i as u32 + 1),
                total_sum: v,
                record_count: 1,
                z_score: None,
            })
            .collect()
    }

    fn sale(date: NaiveDate, total: f64) -> SaleRecord {
        SaleRecord {
            date,
            unit_price: 1.0,
            total,
            extra: Vec::new(),
        }
    }

    #[test]
    fn aggregates_by_date_in_ascending_order() {
        let ds = CleanDataset {
            extra_headers: Vec::new(),
            records: vec![
                sale(day(3), 5.0),
                sale(day(1), 1.0),
                sale(day(3), 2.5),
                sale(day(2), 4.0),
            ],
            stats: CleanStats::default(),
        };
        let daily = aggregate_by_day(&ds);
        let got: Vec<(NaiveDate, f64, usize)> =
            daily.iter().map(|d| (d.date, d.total_sum, d.record_count)).collect();
        assert_eq!(
            got,
            vec![(day(1), 1.0, 1), (day(2), 4.0, 1), (day(3), 7.5, 2)]
        );
        assert!(daily.iter().all(|d| d.z_score.is_none()));
    }

    #[test]
    fn zscore_of_known_series() {
        let (scored, stats) = compute_zscores(series(&[10.0, 10.0, 10.0, 10.0, 100.0])).unwrap();
        assert!((stats.mean - 28.0).abs() < 1e-9);
        assert!((stats.std_dev - 36.0).abs() < 1e-9);

        let last = scored.last().unwrap().z_score.unwrap();
        assert!((last - 2.0).abs() < 1e-9);
        assert!((scored[0].z_score.unwrap() + 0.5).abs() < 1e-9);

        assert!(detect(&scored, 2.5).is_empty());

        let flagged = detect(&scored, 1.5);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].date, day(5));
        assert_eq!(flagged[0].total_sum, 100.0);
    }

    #[test]
    fn threshold_is_strict() {
        let (scored, _) = compute_zscores(series(&[10.0, 10.0, 10.0, 10.0, 100.0])).unwrap();
        // Last z is exactly 2.0 (within float noise); a 2.0 threshold must not
        // flag a value that only reaches it.
        let exact = detect(&scored, scored[4].z_score.unwrap());
        assert!(exact.is_empty());
    }

    #[test]
    fn negative_spikes_are_flagged_too() {
        let mut values = vec![100.0; 20];
        values[7] = 0.0;
        let (scored, _) = compute_zscores(series(&values)).unwrap();
        let flagged = detect(&scored, 2.5);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].date, day(8));
        assert!(flagged[0].z_score < -2.5);
    }

    #[test]
    fn several_anomalies_come_back_in_date_order() {
        // Records arrive newest first; the flagged days must still be ascending.
        let mut records: Vec<SaleRecord> = (1..=30)
            .rev()
            .map(|d| sale(day(d), match d {
                6 => 1000.0,
                21 => 600.0,
                _ => 100.0,
            }))
            .collect();
        records.push(sale(day(21), 400.0));
        let ds = CleanDataset {
            extra_headers: Vec::new(),
            records,
            stats: CleanStats::default(),
        };

        let (scored, _) = compute_zscores(aggregate_by_day(&ds)).unwrap();
        let flagged = detect(&scored, 2.5);
        let dates: Vec<NaiveDate> = flagged.iter().map(|a| a.date).collect();
        assert_eq!(dates, vec![day(6), day(21)]);
        assert!(flagged.iter().all(|a| a.z_score > 2.5));
    }

    #[test]
    fn tiny_but_distinct_totals_still_score() {
        let (scored, stats) = compute_zscores(series(&[1e-13, 3e-13])).unwrap();
        assert!(stats.std_dev > 0.0);
        assert!((scored[0].z_score.unwrap() + 1.0).abs() < 1e-9);
        assert!((scored[1].z_score.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn single_day_is_degenerate() {
        let err = compute_zscores(series(&[42.0])).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateSeries { n: 1, .. }));
    }

    #[test]
    fn constant_series_is_degenerate() {
        let err = compute_zscores(series(&[0.1, 0.1, 0.1, 0.1])).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateSeries { n: 4, .. }));
    }

    #[test]
    fn empty_series_is_degenerate() {
        let err = compute_zscores(Vec::new()).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateSeries { n: 0, .. }));
    }

    #[test]
    fn unscored_days_are_never_flagged() {
        assert!(detect(&series(&[1.0, 1000.0]), 0.1).is_empty());
    }

    #[test]
    fn threshold_validation() {
        assert_eq!(validate_threshold(2.5).unwrap(), 2.5);
        assert!(validate_threshold(0.0).is_err());
        assert!(validate_threshold(-1.0).is_err());
        assert!(validate_threshold(f64::NAN).is_err());
    }
}
