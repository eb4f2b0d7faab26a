//! CSV output formatting
//!
//! One header row, then one row per measured message size, in measurement
//! order. Times are written both in seconds and in microseconds.

use crate::latency::LatencyResult;
use crate::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const LATENCY_CSV_HEADER: &str =
    "size_bytes,rtt_seconds,one_way_seconds,rtt_microseconds,one_way_microseconds";

/// CSV writer for latency results
pub struct LatencyCsvWriter<W: Write> {
    out: W,
}

impl LatencyCsvWriter<BufWriter<File>> {
    /// Create `path` and write the header row
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> LatencyCsvWriter<W> {
    pub fn new(mut out: W) -> Result<Self> {
        writeln!(out, "{}", LATENCY_CSV_HEADER)?;
        Ok(Self { out })
    }

    pub fn append(&mut self, result: &LatencyResult) -> Result<()> {
        writeln!(
            self.out,
            "{},{},{},{},{}",
            result.message_size_bytes,
            result.round_trip_seconds,
            result.one_way_seconds,
            result.round_trip_micros(),
            result.one_way_micros()
        )?;
        Ok(())
    }

    /// Flush and return the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Write all results to `path`
pub fn write_latency_csv(path: &Path, results: &[LatencyResult]) -> Result<()> {
    let mut writer = LatencyCsvWriter::create(path)?;
    for result in results {
        writer.append(result)?;
    }
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Vec<LatencyResult> {
        vec![
            LatencyResult {
                message_size_bytes: 1,
                round_trip_seconds: 0.5,
                one_way_seconds: 0.25,
            },
            LatencyResult {
                message_size_bytes: 1_048_576,
                round_trip_seconds: 0.002,
                one_way_seconds: 0.001,
            },
        ]
    }

    #[test]
    fn test_rows_follow_header() {
        let mut writer = LatencyCsvWriter::new(Vec::new()).unwrap();
        for result in sample() {
            writer.append(&result).unwrap();
        }
        let text = String::from_utf8(writer.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], LATENCY_CSV_HEADER);
        assert_eq!(lines[1], "1,0.5,0.25,500000,250000");
        assert!(lines[2].starts_with("1048576,0.002,0.001,"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_write_latency_csv_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latency.csv");
        write_latency_csv(&path, &sample()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.starts_with("size_bytes,"));
    }

    #[test]
    fn test_header_only_without_results() {
        let writer = LatencyCsvWriter::new(Vec::new()).unwrap();
        let text = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(text, format!("{}\n", LATENCY_CSV_HEADER));
    }
}
