//! Text report for resolved trees
//!
//! Dumps the emitted layout attributes of every node, one attribute per line.
//! It is a debugging aid; serializing to a real layout format happens elsewhere.

pub mod config;
pub mod text;

pub use config::ReportConfig;
pub use text::render_report;
