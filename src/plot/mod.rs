//! Terminal/text plotting.

pub mod ascii;

pub use ascii::render_daily_plot;
