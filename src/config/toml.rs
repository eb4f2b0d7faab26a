//! TOML configuration file parsing

use super::*;
use crate::config::cli::{LatencyArgs, StatsArgs};
use crate::config::cli_convert::parse_size_list;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<FileConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<FileConfig> {
    let config: FileConfig = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge statistics CLI arguments with file configuration (CLI takes precedence)
pub fn merge_stats_args(args: &StatsArgs, mut config: RunConfig) -> RunConfig {
    if let Some(n) = args.n {
        config.dataset_size = n;
    }
    if let Some(mode) = &args.mode {
        config.value_mode = ValueMode::from(mode.clone());
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.verbose {
        config.verbose = true;
    }
    config
}

/// Merge latency CLI arguments with file configuration (CLI takes precedence)
pub fn merge_latency_args(args: &LatencyArgs, mut config: LatencyConfig) -> Result<LatencyConfig> {
    if let Some(iters) = args.iters {
        config.measured_iterations = iters;
    }
    if let Some(warmup) = args.warmup {
        config.warmup_iterations = warmup;
    }
    if let Some(sizes) = &args.sizes {
        config.message_sizes = parse_size_list(sizes)?;
    }
    if args.barrier {
        config.use_barrier = true;
    }
    Ok(config)
}

/// Merge output paths (CLI takes precedence)
pub fn merge_output_args(
    csv: Option<&std::path::PathBuf>,
    json: Option<&std::path::PathBuf>,
    mut output: OutputConfig,
) -> OutputConfig {
    if let Some(path) = csv {
        output.csv_output = Some(path.clone());
    }
    if let Some(path) = json {
        output.json_output = Some(path.clone());
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_basic() {
        let toml = r#"
[stats]
dataset_size = 2000000
value_mode = "int"
seed = 123

[latency]
measured_iterations = 5000
message_sizes = [1, 1024]
use_barrier = true

[output]
csv_output = "latency.csv"
"#;

        let config = parse_toml_string(toml).unwrap();
        let stats = config.stats.unwrap();
        assert_eq!(stats.dataset_size, 2_000_000);
        assert_eq!(stats.value_mode, ValueMode::Int);
        assert_eq!(stats.seed, Some(123));
        assert!(!stats.verbose);

        let latency = config.latency.unwrap();
        assert_eq!(latency.measured_iterations, 5000);
        assert_eq!(latency.warmup_iterations, 200);
        assert_eq!(latency.message_sizes, vec![1, 1024]);
        assert!(latency.use_barrier);

        assert_eq!(config.output.csv_output.unwrap().to_str(), Some("latency.csv"));
        assert!(config.output.json_output.is_none());
    }

    #[test]
    fn test_parse_toml_empty() {
        let config = parse_toml_string("").unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_unknown_mode_in_file_is_kept_for_validation() {
        let config = parse_toml_string("[stats]\nvalue_mode = \"quad\"\n").unwrap();
        assert_eq!(config.stats.unwrap().value_mode, ValueMode::Unrecognized("quad".to_string()));
    }

    #[test]
    fn test_parse_toml_rejects_bad_types() {
        assert!(parse_toml_string("[stats]\ndataset_size = \"many\"\n").is_err());
    }

    #[test]
    fn test_merge_stats_args() {
        let args = StatsArgs {
            mode: Some("INT".to_string()),
            verbose: true,
            ..StatsArgs::default()
        };
        let base = RunConfig {
            dataset_size: 40,
            seed: Some(9),
            ..RunConfig::default()
        };
        let merged = merge_stats_args(&args, base);
        assert_eq!(merged.dataset_size, 40);
        assert_eq!(merged.value_mode, ValueMode::Int);
        assert_eq!(merged.seed, Some(9));
        assert!(merged.verbose);
    }

    #[test]
    fn test_merge_latency_args() {
        let args = LatencyArgs {
            iters: Some(50),
            sizes: Some("8,1k".to_string()),
            ..LatencyArgs::default()
        };
        let merged = merge_latency_args(&args, LatencyConfig::default()).unwrap();
        assert_eq!(merged.measured_iterations, 50);
        assert_eq!(merged.warmup_iterations, 200);
        assert_eq!(merged.message_sizes, vec![8, 1024]);

        let bad = LatencyArgs {
            sizes: Some("8,huge".to_string()),
            ..LatencyArgs::default()
        };
        assert!(merge_latency_args(&bad, LatencyConfig::default()).is_err());
    }
}
