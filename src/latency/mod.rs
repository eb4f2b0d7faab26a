//! Point-to-point latency
//!
//! Measures the average round-trip time between the two members of a group
//! for a list of message sizes. The one-way time is reported as half the
//! round trip; it is not measured independently.

pub mod probe;

use crate::config::validator::validate_latency_config;
use crate::config::LatencyConfig;
use crate::coordinator::agree_on_config;
use crate::error::{RunError, EXIT_FAILURE};
use crate::group::GroupContext;
use anyhow::Result;
use probe::LatencyProbe;
use serde::Serialize;
use std::time::Duration;
use tracing::error;

/// Number of members the latency protocol is defined for
pub const REQUIRED_MEMBERS: usize = 2;

/// Average latency for one message size
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyResult {
    pub message_size_bytes: usize,
    pub round_trip_seconds: f64,
    pub one_way_seconds: f64,
}

impl LatencyResult {
    /// Result of `iterations` round trips that took `elapsed` in total
    pub fn from_elapsed(message_size_bytes: usize, elapsed: Duration, iterations: u64) -> Self {
        let round_trip_seconds = elapsed.as_secs_f64() / iterations as f64;
        Self {
            message_size_bytes,
            round_trip_seconds,
            one_way_seconds: round_trip_seconds / 2.0,
        }
    }

    pub fn round_trip_micros(&self) -> f64 {
        self.round_trip_seconds * 1e6
    }

    pub fn one_way_micros(&self) -> f64 {
        self.one_way_seconds * 1e6
    }
}

/// Coordinator's view of a finished latency run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyOutcome {
    pub config: LatencyConfig,
    pub results: Vec<LatencyResult>,
}

/// Run the latency protocol as this member
///
/// A group that does not have exactly two members is aborted before any
/// configuration is exchanged. Returns `Some` on the coordinator only.
pub fn run_latency(ctx: &GroupContext, local: Option<LatencyConfig>) -> Result<Option<LatencyOutcome>> {
    if ctx.size() != REQUIRED_MEMBERS {
        if ctx.is_coordinator() {
            error!(
                "Latency measurement requires exactly {} members (got {})",
                REQUIRED_MEMBERS,
                ctx.size()
            );
        }
        ctx.abort(EXIT_FAILURE);
        return Err(RunError::Topology {
            pipeline: "latency",
            required: REQUIRED_MEMBERS,
            actual: ctx.size(),
        }
        .into());
    }

    let config = agree_on_config(ctx, local, validate_latency_config)?;
    let results = LatencyProbe::new(ctx, &config).measure_all()?;

    Ok(ctx
        .is_coordinator()
        .then(|| LatencyOutcome { config, results }))
}
