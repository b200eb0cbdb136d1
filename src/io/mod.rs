//! Input/output helpers.
//!
//! - CSV ingest (`ingest`)
//! - temp-file-then-rename writes (`atomic`)
//! - daily/cleaned CSV and JSON summary exports (`export`)

pub mod atomic;
pub mod export;
pub mod ingest;

pub use atomic::write_atomic;
pub use export::*;
pub use ingest::*;
