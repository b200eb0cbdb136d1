//! `sales-anomaly` library crate.
//!
//! The binary (`sar`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the cleaning and detection stages stay usable on their own
//! - the external narrative service sits behind a trait and can be mocked

pub mod app;
pub mod clean;
pub mod cli;
pub mod detect;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod math;
pub mod narrative;
pub mod plot;
pub mod report;
pub mod tui;
