//! Output formatting
//!
//! - `text`: console report printed by the coordinator
//! - `csv`: latency results table
//! - `json`: machine-readable run report

pub mod csv;
pub mod json;
pub mod text;
