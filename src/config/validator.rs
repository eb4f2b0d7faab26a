//! Configuration validation
//!
//! Validators collect every violated constraint instead of stopping at the
//! first one, so the coordinator can report the complete list before the
//! group aborts.

use super::*;
use crate::group::protocol::MAX_PAYLOAD_LEN;

/// Check a statistics configuration against the group size
///
/// Returns one message per violated constraint; empty means valid.
pub fn validate_run_config(config: &RunConfig, group_size: usize) -> Vec<String> {
    let mut violations = Vec::new();
    let n = config.dataset_size;
    let size = group_size as i64;

    if n <= 0 {
        violations.push(format!("dataset size must be > 0 (got {})", n));
    }

    if n < size {
        violations.push(format!(
            "dataset size ({}) is smaller than the group size ({}); members would receive empty partitions",
            n, size
        ));
    }

    if size > 0 && n % size != 0 {
        violations.push(format!("dataset size ({}) is not divisible by the group size ({})", n, size));
    }

    if let ValueMode::Unrecognized(name) = &config.value_mode {
        violations.push(format!("unrecognized value mode '{}' (expected 'float' or 'int')", name));
    }

    violations
}

/// Check a latency configuration
pub fn validate_latency_config(config: &LatencyConfig, _group_size: usize) -> Vec<String> {
    let mut violations = Vec::new();

    if config.measured_iterations == 0 {
        violations.push("measured iterations must be > 0".to_string());
    }

    for size in &config.message_sizes {
        if *size as u64 > MAX_PAYLOAD_LEN {
            violations.push(format!("message size {} exceeds the 1GiB transfer limit", size));
        }
    }

    violations
}
