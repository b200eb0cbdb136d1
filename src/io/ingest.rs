//! CSV ingest.
//!
//! This module turns a delimited sales export into a raw [`Dataset`]:
//!
//! - **Strict schema** for the required columns (`Date`, `Unit price`, `Total`)
//! - **Strict rows**: every row must have as many fields as the header
//! - prices/totals that are empty or a known missing marker (`NaN`, `NA`, ...)
//!   become `None` so the cleaner can impute them; any other non-numeric cell
//!   is a load error
//! - every other column is carried through untouched
//!
//! No cleaning happens here; see `crate::clean`.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{Dataset, Record};
use crate::error::PipelineError;

const COL_DATE: &str = "date";
const COL_UNIT_PRICE: &str = "unit price";
const COL_TOTAL: &str = "total";

/// Cell values read as "no value" in numeric columns.
const MISSING_MARKERS: [&str; 5] = ["NaN", "nan", "NA", "N/A", "null"];

/// Load a dataset from a CSV file on disk.
pub fn load(path: &Path) -> Result<Dataset, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).map_err(|e| {
        PipelineError::Input(format!("Failed to open CSV '{}': {e}", path.display()))
    })?;

    let dataset = read_dataset(file)?;
    tracing::info!(
        path = %path.display(),
        rows = dataset.records.len(),
        passthrough_columns = dataset.extra_headers.len(),
        "loaded dataset"
    );
    Ok(dataset)
}

/// Parse a dataset from any reader (header row required).
pub fn read_dataset<R: Read>(reader: R) -> Result<Dataset, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::Input(format!("Failed to read CSV headers: {e}")))?
        .clone();

    let layout = ColumnLayout::from_headers(&headers)?;

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header row; lines are 1-based.
        let line = idx + 2;
        let row = result.map_err(|e| PipelineError::Csv {
            line,
            message: e.to_string(),
        })?;
        records.push(layout.parse_row(&row, line)?);
    }

    Ok(Dataset {
        extra_headers: layout.extra_headers,
        records,
    })
}

/// Where each column of interest lives in a row.
struct ColumnLayout {
    date: usize,
    unit_price: usize,
    total: usize,
    extra: Vec<usize>,
    extra_headers: Vec<String>,
}

impl ColumnLayout {
    fn from_headers(headers: &StringRecord) -> Result<Self, PipelineError> {
        let header_map: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (normalize_header_name(name), idx))
            .collect();

        let required = |name: &str, display: &str| {
            header_map
                .get(name)
                .copied()
                .ok_or_else(|| PipelineError::Input(format!("Missing required column: `{display}`")))
        };

        let date = required(COL_DATE, "Date")?;
        let unit_price = required(COL_UNIT_PRICE, "Unit price")?;
        let total = required(COL_TOTAL, "Total")?;

        let mut extra = Vec::new();
        let mut extra_headers = Vec::new();
        for (idx, name) in headers.iter().enumerate() {
            if idx == date || idx == unit_price || idx == total {
                continue;
            }
            extra.push(idx);
            extra_headers.push(clean_header_name(name).to_string());
        }

        Ok(Self {
            date,
            unit_price,
            total,
            extra,
            extra_headers,
        })
    }

    fn parse_row(&self, row: &StringRecord, line: usize) -> Result<Record, PipelineError> {
        let cell = |idx: usize| row.get(idx).unwrap_or("");
        let number = |idx: usize, column: &str| {
            parse_opt_f64(cell(idx)).map_err(|value| PipelineError::Csv {
                line,
                message: format!("column `{column}`: '{value}' is not a number"),
            })
        };

        Ok(Record {
            line,
            date: cell(self.date).to_string(),
            unit_price: number(self.unit_price, "Unit price")?,
            total: number(self.total, "Total")?,
            extra: self.extra.iter().map(|&idx| cell(idx).to_string()).collect(),
        })
    }
}

fn clean_header_name(name: &str) -> &str {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, schema validation will incorrectly
    // report missing columns.
    name.trim().trim_start_matches('\u{feff}')
}

fn normalize_header_name(name: &str) -> String {
    clean_header_name(name).to_ascii_lowercase()
}

/// `Ok(None)` for empty cells and missing markers, `Err(cell)` for anything
/// else that isn't a finite number.
fn parse_opt_f64(s: &str) -> Result<Option<f64>, &str> {
    let s = s.trim();
    if s.is_empty() || MISSING_MARKERS.contains(&s) {
        return Ok(None);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_required_and_passthrough_columns() {
        let csv = "\u{feff}Invoice ID,Date,Unit price,Total,Payment\n\
                   750-67-8428,1/5/2019,74.69,548.97,Ewallet\n\
                   226-31-3081,3/8/2019,,80.22,Cash\n";
        let ds = read_dataset(csv.as_bytes()).unwrap();

        assert_eq!(ds.extra_headers, vec!["Invoice ID", "Payment"]);
        assert_eq!(ds.records.len(), 2);
        assert_eq!(ds.records[0].date, "1/5/2019");
        assert_eq!(ds.records[0].unit_price, Some(74.69));
        assert_eq!(ds.records[0].extra, vec!["750-67-8428", "Ewallet"]);
        assert_eq!(ds.records[1].unit_price, None);
        assert_eq!(ds.records[1].line, 3);
    }

    #[test]
    fn headers_match_case_insensitively() {
        let csv = "DATE,UNIT PRICE,total\n2019-01-01,1,2\n";
        let ds = read_dataset(csv.as_bytes()).unwrap();
        assert_eq!(ds.records[0].total, Some(2.0));
        assert!(ds.extra_headers.is_empty());
    }

    #[test]
    fn missing_markers_are_missing() {
        for marker in ["", "NaN", "nan", "NA", "N/A", "null"] {
            assert_eq!(parse_opt_f64(marker), Ok(None), "{marker:?}");
        }
        assert_eq!(parse_opt_f64(" 12.5 "), Ok(Some(12.5)));
        assert_eq!(parse_opt_f64("-3"), Ok(Some(-3.0)));
        assert_eq!(parse_opt_f64("inf"), Err("inf"));
    }

    #[test]
    fn non_numeric_total_is_rejected_not_imputed() {
        let csv = "Date,Unit price,Total\n\
                   2019-01-01,1,100\n\
                   2019-01-02,1,$5000.00\n\
                   2019-01-03,1,300\n";
        let err = read_dataset(csv.as_bytes()).unwrap_err();
        match err {
            PipelineError::Csv { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("Total"), "{message}");
                assert!(message.contains("$5000.00"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn ragged_row_is_rejected() {
        // An unquoted thousands separator splits the total into two fields.
        let csv = "Date,Unit price,Total\n\
                   2019-01-03,1,300\n\
                   2019-01-04,1,1,234.50\n";
        let err = read_dataset(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::Csv { line: 3, .. }), "{err:?}");
    }

    #[test]
    fn missing_required_column_is_rejected() {
        let csv = "Date,Total\n2019-01-01,5\n";
        let err = read_dataset(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::Input(ref m) if m.contains("Unit price")));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load(Path::new("definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { .. }));
    }
}
