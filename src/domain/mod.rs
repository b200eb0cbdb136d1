//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw and cleaned sales records (`Record`, `SaleRecord`)
//! - the datasets that carry them between stages (`Dataset`, `CleanDataset`)
//! - detector outputs (`DailyAggregate`, `SeriesStats`, `Anomaly`)
//! - run configuration (`PipelineConfig`, `DatePolicy`)

pub mod types;

pub use types::*;
