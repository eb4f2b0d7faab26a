//! CLI to Config conversion utilities

use crate::config::cli::{GroupArgs, LatencyArgs, StatsArgs};
use crate::config::toml::{merge_latency_args, merge_output_args, merge_stats_args, parse_toml_file};
use crate::config::{FileConfig, LatencyConfig, OutputConfig, RunConfig};
use anyhow::{Context, Result};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

/// Default group size for `stats` in local mode
pub const DEFAULT_STATS_MEMBERS: usize = 4;

/// Default group size for `latency` in local mode
pub const DEFAULT_LATENCY_MEMBERS: usize = 2;

/// Where the members of a group run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupLayout {
    /// All members are threads of this process
    Local { size: usize },
    /// This process is member `rank` of a TCP mesh
    Mesh {
        rank: usize,
        hosts: Vec<SocketAddr>,
        connect_timeout: Duration,
    },
}

impl GroupLayout {
    /// Number of members in the group
    pub fn size(&self) -> usize {
        match self {
            GroupLayout::Local { size } => *size,
            GroupLayout::Mesh { hosts, .. } => hosts.len(),
        }
    }
}

/// Parse a size string (e.g., "1", "4k", "1M") to bytes
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if s.ends_with("k") || s.ends_with("kb") {
        (s.trim_end_matches("kb").trim_end_matches("k"), 1024u64)
    } else if s.ends_with("m") || s.ends_with("mb") {
        (s.trim_end_matches("mb").trim_end_matches("m"), 1024 * 1024)
    } else if s.ends_with("g") || s.ends_with("gb") {
        (s.trim_end_matches("gb").trim_end_matches("g"), 1024 * 1024 * 1024)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str.parse()
        .with_context(|| format!("Invalid size format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Size out of range: {}", s))
}

/// Parse a comma-separated list of sizes, keeping the given order
pub fn parse_size_list(s: &str) -> Result<Vec<usize>> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let bytes = parse_size(part)?;
            usize::try_from(bytes).with_context(|| format!("Size too large for this platform: {}", part))
        })
        .collect()
}

/// Parse a comma-separated host list into socket addresses (rank order)
pub fn parse_hosts(s: &str) -> Result<Vec<SocketAddr>> {
    let hosts: Vec<SocketAddr> = s
        .split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(|host| {
            host.to_socket_addrs()
                .with_context(|| format!("Invalid host address: {}", host))?
                .next()
                .with_context(|| format!("Host address did not resolve: {}", host))
        })
        .collect::<Result<_>>()?;

    if hosts.is_empty() {
        anyhow::bail!("Host list is empty");
    }
    Ok(hosts)
}

/// Decide the group layout from the CLI
pub fn resolve_group(args: &GroupArgs, default_members: usize) -> Result<GroupLayout> {
    match (args.rank, args.hosts.as_deref()) {
        (Some(rank), Some(hosts)) => {
            let hosts = parse_hosts(hosts)?;
            if rank >= hosts.len() {
                anyhow::bail!("--rank {} is outside the host list ({} members)", rank, hosts.len());
            }
            Ok(GroupLayout::Mesh {
                rank,
                hosts,
                connect_timeout: Duration::from_secs(args.connect_timeout),
            })
        }
        (None, None) => {
            let size = args.np.unwrap_or(default_members);
            if size == 0 {
                anyhow::bail!("--np must be at least 1");
            }
            Ok(GroupLayout::Local { size })
        }
        _ => anyhow::bail!("--rank and --hosts must be given together"),
    }
}

fn load_file_config(path: Option<&std::path::Path>) -> Result<FileConfig> {
    match path {
        Some(path) => parse_toml_file(path),
        None => Ok(FileConfig::default()),
    }
}

/// Build the coordinator's statistics configuration (file, then CLI overrides)
pub fn build_stats_config(args: &StatsArgs) -> Result<(RunConfig, OutputConfig)> {
    let file = load_file_config(args.config.as_deref())?;
    let config = merge_stats_args(args, file.stats.unwrap_or_default());
    let output = merge_output_args(None, args.json_output.as_ref(), file.output);
    Ok((config, output))
}

/// Build the coordinator's latency configuration (file, then CLI overrides)
pub fn build_latency_config(args: &LatencyArgs) -> Result<(LatencyConfig, OutputConfig)> {
    let file = load_file_config(args.config.as_deref())?;
    let config = merge_latency_args(args, file.latency.unwrap_or_default())?;
    let output = merge_output_args(args.csv.as_ref(), args.json_output.as_ref(), file.output);
    Ok((config, output))
}
