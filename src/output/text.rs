//! Human-readable text output
//!
//! Only the coordinator reports. Everything here goes to stdout; diagnostics
//! go through `tracing` to stderr.

use crate::latency::{LatencyOutcome, LatencyResult};
use crate::stats::{StatsOutcome, StatsSummary};
use crate::util::time::format_size;
use std::io::{self, Write};

/// Warn about a group too small to exercise the collectives
pub fn single_member_warning(group_size: usize) -> Option<&'static str> {
    (group_size == 1).then_some(
        "[WARNING] Running with a single member. Use --np 4 (or more) to see the collectives at work.",
    )
}

/// Write the global statistics block
pub fn write_stats_report<W: Write>(out: &mut W, outcome: &StatsOutcome) -> io::Result<()> {
    if let Some(warning) = single_member_warning(outcome.group_size) {
        writeln!(out, "{}", warning)?;
    }

    writeln!(out)?;
    writeln!(out, "Global statistics:")?;
    match &outcome.summary {
        StatsSummary::Float(stats) => {
            writeln!(out, "  Minimum: {:.6}", stats.min)?;
            writeln!(out, "  Maximum: {:.6}", stats.max)?;
        }
        StatsSummary::Int(stats) => {
            writeln!(out, "  Minimum: {}", stats.min)?;
            writeln!(out, "  Maximum: {}", stats.max)?;
        }
    }
    writeln!(out, "  Average: {:.6}", outcome.summary.average())?;
    Ok(())
}

/// Write the latency header line
pub fn write_latency_header<W: Write>(out: &mut W, outcome: &LatencyOutcome) -> io::Result<()> {
    let config = &outcome.config;
    writeln!(
        out,
        "Latency measurement with iters={}, warmup={}, sizes={:?}{}",
        config.measured_iterations,
        config.warmup_iterations,
        config.message_sizes,
        if config.use_barrier { ", barrier" } else { "" }
    )
}

/// Write one line per measured size
pub fn write_latency_line<W: Write>(out: &mut W, result: &LatencyResult) -> io::Result<()> {
    writeln!(
        out,
        "Size {:>8} B ({:>9})  |  avg RTT: {:9.2} µs  |  one-way ~ {:9.2} µs",
        result.message_size_bytes,
        format_size(result.message_size_bytes),
        result.round_trip_micros(),
        result.one_way_micros()
    )
}

pub fn write_latency_report<W: Write>(out: &mut W, outcome: &LatencyOutcome) -> io::Result<()> {
    write_latency_header(out, outcome)?;
    for result in &outcome.results {
        write_latency_line(out, result)?;
    }
    Ok(())
}

/// Print the statistics report to stdout
pub fn print_stats_report(outcome: &StatsOutcome) -> io::Result<()> {
    let stdout = io::stdout();
    write_stats_report(&mut stdout.lock(), outcome)
}

/// Print the latency report to stdout
pub fn print_latency_report(outcome: &LatencyOutcome) -> io::Result<()> {
    let stdout = io::stdout();
    write_latency_report(&mut stdout.lock(), outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LatencyConfig, RunConfig, ValueMode};
    use crate::stats::GlobalStats;

    fn render<F: Fn(&mut Vec<u8>) -> io::Result<()>>(f: F) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_float_report_uses_six_decimals() {
        let outcome = StatsOutcome {
            config: RunConfig::default(),
            group_size: 4,
            summary: StatsSummary::Float(GlobalStats {
                min: 0.5,
                max: 99.25,
                average: 50.0,
            }),
        };
        let text = render(|out| write_stats_report(out, &outcome));
        assert!(text.contains("Minimum: 0.500000"));
        assert!(text.contains("Maximum: 99.250000"));
        assert!(text.contains("Average: 50.000000"));
        assert!(!text.contains("WARNING"));
    }

    #[test]
    fn test_int_report_prints_integer_extremes() {
        let outcome = StatsOutcome {
            config: RunConfig {
                value_mode: ValueMode::Int,
                ..RunConfig::default()
            },
            group_size: 1,
            summary: StatsSummary::Int(GlobalStats {
                min: 0,
                max: 100,
                average: 50.125,
            }),
        };
        let text = render(|out| write_stats_report(out, &outcome));
        assert!(text.contains("Minimum: 0\n"));
        assert!(text.contains("Maximum: 100\n"));
        assert!(text.contains("Average: 50.125000"));
        assert!(text.starts_with("[WARNING]"));
    }

    #[test]
    fn test_latency_report() {
        let outcome = LatencyOutcome {
            config: LatencyConfig::default(),
            results: vec![
                LatencyResult {
                    message_size_bytes: 1,
                    round_trip_seconds: 2e-6,
                    one_way_seconds: 1e-6,
                },
                LatencyResult {
                    message_size_bytes: 1024,
                    round_trip_seconds: 5e-6,
                    one_way_seconds: 2.5e-6,
                },
            ],
        };
        let text = render(|out| write_latency_report(out, &outcome));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("iters=10000"));
        assert!(lines[0].contains("sizes=[1, 1024, 1048576]"));
        assert!(lines[1].contains("2.00 µs"));
        assert!(lines[2].contains("1 KiB"));
        assert!(lines[2].contains("2.50 µs"));
    }
}
