//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//!
//! The coordinator assembles a [`RunConfig`] or [`LatencyConfig`] from the CLI
//! (optionally on top of a TOML file) and broadcasts it; every other member
//! works only with the broadcast copy.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Statistics run configuration
///
/// Identical on every member once broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Total number of samples across the group
    #[serde(default = "default_dataset_size")]
    pub dataset_size: i64,
    /// Sample type
    #[serde(default)]
    pub value_mode: ValueMode,
    /// RNG seed (random per run when absent)
    #[serde(default)]
    pub seed: Option<u64>,
    /// Per-member diagnostics
    #[serde(default)]
    pub verbose: bool,
}

fn default_dataset_size() -> i64 {
    1_000_000
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dataset_size: default_dataset_size(),
            value_mode: ValueMode::default(),
            seed: None,
            verbose: false,
        }
    }
}

impl RunConfig {
    /// Elements per member for a group of `group_size`
    ///
    /// Only meaningful after validation.
    pub fn chunk_size(&self, group_size: usize) -> usize {
        usize::try_from(self.dataset_size).unwrap_or(0) / group_size.max(1)
    }
}

/// Sample type of the dataset
///
/// Parsing never fails: unknown names are kept as [`ValueMode::Unrecognized`]
/// and rejected by the validator, so a bad mode goes through the same
/// group-wide rejection as every other invalid field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValueMode {
    /// float64 samples, uniform in [0, 100)
    Float,
    /// int32 samples, uniform in [0, 100]
    Int,
    Unrecognized(String),
}

impl Default for ValueMode {
    fn default() -> Self {
        Self::Float
    }
}

impl From<String> for ValueMode {
    fn from(name: String) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "float" => ValueMode::Float,
            "int" => ValueMode::Int,
            _ => ValueMode::Unrecognized(name),
        }
    }
}

impl From<&str> for ValueMode {
    fn from(name: &str) -> Self {
        ValueMode::from(name.to_string())
    }
}

impl From<ValueMode> for String {
    fn from(mode: ValueMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for ValueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueMode::Float => write!(f, "float"),
            ValueMode::Int => write!(f, "int"),
            ValueMode::Unrecognized(name) => write!(f, "{}", name),
        }
    }
}

/// Latency benchmark configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyConfig {
    /// Timed ping-pong iterations per message size
    #[serde(default = "default_measured_iterations")]
    pub measured_iterations: u64,
    /// Untimed iterations before each measurement
    #[serde(default = "default_warmup_iterations")]
    pub warmup_iterations: u64,
    /// Message sizes in bytes, measured in this order
    #[serde(default = "default_message_sizes")]
    pub message_sizes: Vec<usize>,
    /// Barrier between warm-up and the timed phase
    #[serde(default)]
    pub use_barrier: bool,
}

fn default_measured_iterations() -> u64 {
    10_000
}

fn default_warmup_iterations() -> u64 {
    200
}

fn default_message_sizes() -> Vec<usize> {
    vec![1, 1024, 1_048_576]
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            measured_iterations: default_measured_iterations(),
            warmup_iterations: default_warmup_iterations(),
            message_sizes: default_message_sizes(),
            use_barrier: false,
        }
    }
}

/// Result files written by the coordinator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Latency CSV path
    pub csv_output: Option<PathBuf>,
    /// JSON report path
    pub json_output: Option<PathBuf>,
}

/// Contents of a `--config` TOML file
///
/// ```toml
/// [stats]
/// dataset_size = 2000000
/// value_mode = "int"
/// seed = 123
///
/// [latency]
/// measured_iterations = 5000
/// message_sizes = [1, 1024]
///
/// [output]
/// csv_output = "latency.csv"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub stats: Option<RunConfig>,
    #[serde(default)]
    pub latency: Option<LatencyConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_mode_parsing() {
        assert_eq!(ValueMode::from("float"), ValueMode::Float);
        assert_eq!(ValueMode::from(" INT "), ValueMode::Int);
        assert_eq!(ValueMode::from("double"), ValueMode::Unrecognized("double".to_string()));
    }

    #[test]
    fn test_value_mode_survives_binary_encoding() {
        let config = RunConfig {
            dataset_size: 8,
            value_mode: ValueMode::Unrecognized("bits".to_string()),
            seed: Some(42),
            verbose: true,
        };
        let bytes = bincode::serialize(&config).unwrap();
        let decoded: RunConfig = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_chunk_size() {
        let config = RunConfig {
            dataset_size: 1_000_000,
            ..RunConfig::default()
        };
        assert_eq!(config.chunk_size(4), 250_000);

        let negative = RunConfig {
            dataset_size: -5,
            ..RunConfig::default()
        };
        assert_eq!(negative.chunk_size(4), 0);
    }

    #[test]
    fn test_defaults() {
        let latency = LatencyConfig::default();
        assert_eq!(latency.measured_iterations, 10_000);
        assert_eq!(latency.warmup_iterations, 200);
        assert_eq!(latency.message_sizes, vec![1, 1024, 1_048_576]);
        assert_eq!(RunConfig::default().value_mode, ValueMode::Float);
    }
}
