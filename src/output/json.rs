//! JSON output formatting
//!
//! A run report is the result of one pipeline plus enough context to compare
//! runs later: host name, timestamp and transport.

use crate::latency::LatencyOutcome;
use crate::stats::StatsOutcome;
use crate::Result;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Where and when a run happened
#[derive(Debug, Clone, Serialize)]
pub struct JsonRunInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// RFC 3339, UTC
    pub timestamp: String,
    pub transport: String,
    pub group_size: usize,
}

impl JsonRunInfo {
    pub fn capture(transport: &str, group_size: usize) -> Self {
        Self {
            hostname: hostname::get().ok().map(|h| h.to_string_lossy().into_owned()),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            transport: transport.to_string(),
            group_size,
        }
    }
}

/// Complete JSON report
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "benchmark", rename_all = "lowercase")]
pub enum JsonReport<'a> {
    Stats {
        info: JsonRunInfo,
        #[serde(flatten)]
        outcome: &'a StatsOutcome,
    },
    Latency {
        info: JsonRunInfo,
        #[serde(flatten)]
        outcome: &'a LatencyOutcome,
    },
}

/// Write a report to `path`
pub fn write_json_report(path: &Path, report: &JsonReport<'_>, pretty: bool) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);

    if pretty {
        serde_json::to_writer_pretty(file, report)?;
    } else {
        serde_json::to_writer(file, report)?;
    }

    Ok(())
}
