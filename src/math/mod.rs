//! Mathematical utilities: median and population moments.

pub mod stats;

pub use stats::*;
