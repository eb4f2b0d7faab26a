//! CLI argument parsing using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// groupbench - group statistics and point-to-point latency benchmarks
#[derive(Parser, Debug)]
#[command(name = "groupbench")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log filter when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "GROUPBENCH_LOG", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Distributed min / max / average over a generated dataset
    Stats(StatsArgs),
    /// Ping-pong round-trip latency between two members
    Latency(LatencyArgs),
}

/// How this process takes part in a group
///
/// Without `--rank` the whole group runs as threads of this process
/// (`--np` members). With `--rank` this process is one member of a TCP mesh
/// whose addresses, in rank order, are given by `--hosts`.
#[derive(Args, Debug, Clone, Default)]
pub struct GroupArgs {
    /// Number of in-process members (local mode)
    #[arg(long)]
    pub np: Option<usize>,

    /// This process's rank in a multi-process group
    #[arg(long, requires = "hosts", conflicts_with = "np")]
    pub rank: Option<usize>,

    /// Comma-separated member addresses in rank order (e.g., "10.0.1.10:7700,10.0.1.11:7700")
    #[arg(long, requires = "rank")]
    pub hosts: Option<String>,

    /// Seconds to wait for the mesh to form
    #[arg(long, default_value = "30")]
    pub connect_timeout: u64,
}

#[derive(Args, Debug, Clone, Default)]
pub struct StatsArgs {
    /// Total dataset size (must be a positive multiple of the group size)
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    pub n: Option<i64>,

    /// Sample type: float or int
    #[arg(short = 'm', long)]
    pub mode: Option<String>,

    /// RNG seed for reproducible datasets
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print per-member diagnostics
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// TOML configuration file ([stats] and [output] tables)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Write the result as JSON to this file
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    #[command(flatten)]
    pub group: GroupArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct LatencyArgs {
    /// Timed round trips per message size
    #[arg(short = 'i', long)]
    pub iters: Option<u64>,

    /// Untimed round trips before each measurement
    #[arg(short = 'w', long)]
    pub warmup: Option<u64>,

    /// Comma-separated message sizes (e.g., "1,1k,1M")
    #[arg(short = 's', long)]
    pub sizes: Option<String>,

    /// Synchronize both members between warm-up and measurement
    #[arg(long)]
    pub barrier: bool,

    /// Write results as CSV to this file
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// TOML configuration file ([latency] and [output] tables)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Write results as JSON to this file
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    #[command(flatten)]
    pub group: GroupArgs,
}
