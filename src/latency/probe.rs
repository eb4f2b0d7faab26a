//! Ping-pong latency probe
//!
//! Both members step through the same sequence for every message size:
//!
//! 1. warm-up round trips (not timed)
//! 2. optional barrier
//! 3. timed round trips between two timestamps
//!
//! Rank 0 always sends first and rank 1 always receives first, so the two
//! members never both block on a send.

use super::LatencyResult;
use crate::config::LatencyConfig;
use crate::error::GroupError;
use crate::group::{GroupContext, COORDINATOR};
use crate::util::time::{format_duration, Timestamp};
use tracing::debug;

/// Tag of every ping-pong message
pub const PING_PONG_TAG: u32 = 77;

pub struct LatencyProbe<'a> {
    ctx: &'a GroupContext,
    config: &'a LatencyConfig,
    peer: usize,
}

impl<'a> LatencyProbe<'a> {
    /// Probe between this member and its single peer
    ///
    /// The group must have exactly two members.
    pub fn new(ctx: &'a GroupContext, config: &'a LatencyConfig) -> Self {
        let peer = if ctx.rank() == COORDINATOR { 1 } else { COORDINATOR };
        Self { ctx, config, peer }
    }

    /// Measure every configured size, in the configured order
    pub fn measure_all(&self) -> Result<Vec<LatencyResult>, GroupError> {
        self.config
            .message_sizes
            .iter()
            .map(|&size| self.measure(size))
            .collect()
    }

    /// Measure one message size
    pub fn measure(&self, message_size: usize) -> Result<LatencyResult, GroupError> {
        let mut buf = vec![0u8; message_size];

        if self.config.use_barrier {
            self.ctx.barrier()?;
        }

        for _ in 0..self.config.warmup_iterations {
            self.round_trip(&mut buf)?;
        }

        if self.config.use_barrier {
            self.ctx.barrier()?;
        }

        let start = Timestamp::now();
        for _ in 0..self.config.measured_iterations {
            self.round_trip(&mut buf)?;
        }
        let elapsed = Timestamp::now().duration_since(start);

        let result = LatencyResult::from_elapsed(message_size, elapsed, self.config.measured_iterations);
        debug!(
            size = message_size,
            rtt_us = result.round_trip_micros(),
            total = %format_duration(elapsed),
            "measured"
        );
        Ok(result)
    }

    fn round_trip(&self, buf: &mut [u8]) -> Result<(), GroupError> {
        if self.ctx.rank() == COORDINATOR {
            self.ctx.send(buf, self.peer, PING_PONG_TAG)?;
            self.ctx.receive(buf, self.peer, PING_PONG_TAG)
        } else {
            self.ctx.receive(buf, self.peer, PING_PONG_TAG)?;
            self.ctx.send(buf, self.peer, PING_PONG_TAG)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::run_local_group;

    fn config(sizes: Vec<usize>, use_barrier: bool) -> LatencyConfig {
        LatencyConfig {
            measured_iterations: 20,
            warmup_iterations: 3,
            message_sizes: sizes,
            use_barrier,
        }
    }

    #[test]
    fn test_probe_both_roles() {
        let config = config(vec![16, 0], false);
        let results = run_local_group(2, |ctx| Ok(LatencyProbe::new(ctx, &config).measure_all()?));

        for member in results {
            let member = member.unwrap();
            assert_eq!(member.len(), 2);
            assert_eq!(member[0].message_size_bytes, 16);
            assert_eq!(member[1].message_size_bytes, 0);
        }
    }

    #[test]
    fn test_probe_with_barrier() {
        let config = config(vec![64], true);
        let results = run_local_group(2, |ctx| Ok(LatencyProbe::new(ctx, &config).measure(64)?));
        for result in results {
            assert!(result.unwrap().round_trip_seconds > 0.0);
        }
    }
}
