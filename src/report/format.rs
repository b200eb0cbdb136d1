//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the cleaning/detection code stays free of presentation concerns
//! - output changes are localized (the anomaly table is shared by the
//!   terminal summary, the narrative prompt, and the report)

use crate::app::pipeline::RunOutput;
use crate::domain::Anomaly;

/// Plain-text anomaly table (`date`, `total_sum`, `z_score`).
pub fn format_anomaly_table(anomalies: &[Anomaly]) -> String {
    if anomalies.is_empty() {
        return "(no anomalies detected)\n".to_string();
    }

    let mut out = String::new();
    out.push_str(&format!("{:<10} {:>14} {:>8}\n", "date", "total_sum", "z_score"));
    out.push_str(&format!("{:-<10} {:->14} {:->8}\n", "", "", ""));
    for a in anomalies {
        out.push_str(&format!(
            "{:<10} {:>14.2} {:>8.2}\n",
            a.date.to_string(),
            a.total_sum,
            a.z_score
        ));
    }
    out
}

/// Format the full run summary printed after `sar run`.
pub fn format_run_summary(run: &RunOutput) -> String {
    let mut out = String::new();
    let clean = &run.clean.stats;

    out.push_str("=== sar - Sales Anomaly Report ===\n");
    out.push_str(&format!("Cleaned {} bad rows/duplicates\n", clean.rows_removed()));
    out.push_str(&format!(
        "Cleaning: rows_in={} | duplicates={} | imputed unit_price={} total={} | non_positive={} | bad_dates={} | rows_out={}\n",
        clean.rows_in,
        clean.duplicates_removed,
        clean.unit_price_imputed,
        clean.total_imputed,
        clean.non_positive_dropped,
        clean.malformed_dates_skipped,
        clean.rows_out,
    ));
    out.push_str(&format!("Total revenue: {}\n", fmt_money(run.clean.total_revenue())));

    if let Some((first, last)) = run.clean.date_range() {
        out.push_str(&format!("Dates: {first} .. {last} ({} days)\n", run.daily.len()));
    }
    out.push_str(&format!(
        "Daily totals: mean={:.2} std={:.2} (population, n={})\n",
        run.stats.mean, run.stats.std_dev, run.stats.n
    ));

    out.push_str(&format!(
        "\nAnomalies (|z| > {}): {}\n",
        run.threshold,
        run.anomalies.len()
    ));
    out.push_str(&format_anomaly_table(&run.anomalies));

    out
}

/// `$1,234.56`-style currency formatting.
pub fn fmt_money(v: f64) -> String {
    let sign = if v < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", v.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}${grouped}.{frac_part}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn money_groups_thousands() {
        assert_eq!(fmt_money(0.0), "$0.00");
        assert_eq!(fmt_money(999.999), "$1,000.00");
        assert_eq!(fmt_money(368_123.4), "$368,123.40");
        assert_eq!(fmt_money(-1234567.891), "-$1,234,567.89");
    }

    #[test]
    fn anomaly_table_lists_rows_in_order() {
        let anomalies = vec![
            Anomaly {
                date: NaiveDate::from_ymd_opt(2019, 1, 15).unwrap(),
                total_sum: 54731.771,
                z_score: 9.166,
            },
            Anomaly {
                date: NaiveDate::from_ymd_opt(2019, 2, 1).unwrap(),
                total_sum: 12.0,
                z_score: -2.6,
            },
        ];
        let table = format_anomaly_table(&anomalies);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("date"));
        assert!(lines[2].starts_with("2019-01-15"));
        assert!(lines[2].contains("54731.77"));
        assert!(lines[2].ends_with("9.17"));
        assert!(lines[3].ends_with("-2.60"));
    }

    #[test]
    fn run_summary_counts_removed_rows() {
        let run = RunOutput {
            input: "sales.csv".into(),
            threshold: 2.5,
            clean: crate::domain::CleanDataset {
                stats: crate::domain::CleanStats {
                    rows_in: 10,
                    duplicates_removed: 2,
                    non_positive_dropped: 1,
                    rows_out: 7,
                    ..Default::default()
                },
                ..Default::default()
            },
            daily: Vec::new(),
            stats: crate::domain::SeriesStats {
                n: 0,
                mean: 0.0,
                std_dev: 0.0,
            },
            anomalies: Vec::new(),
        };
        let summary = format_run_summary(&run);
        assert!(summary.contains("Cleaned 3 bad rows/duplicates\n"), "{summary}");
        assert!(summary.contains("rows_in=10"));
        assert!(summary.contains("(no anomalies detected)"));
    }

    #[test]
    fn empty_anomaly_table_says_so() {
        assert_eq!(format_anomaly_table(&[]), "(no anomalies detected)\n");
    }
}
