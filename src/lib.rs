//! groupbench - collective statistics and latency over a process group
//!
//! A fixed group of members, identified by rank, runs the same program and
//! coordinates only through broadcast, scatter, reduce, barrier and tagged
//! point-to-point messages.
//!
//! # Architecture
//!
//! - **Group substrate**: in-process (threads) or multi-process (TCP mesh)
//! - **Coordinator consensus**: broadcast config, validate everywhere, broadcast verdict
//! - **Statistics**: global min / max / average of a dataset held by the coordinator
//! - **Latency**: two-member ping-pong round-trip time per message size

pub mod config;
pub mod coordinator;
pub mod error;
pub mod group;
pub mod latency;
pub mod output;
pub mod stats;
pub mod util;

// Re-export commonly used types
pub use config::{LatencyConfig, RunConfig, ValueMode};
pub use error::{GroupError, RunError};
pub use group::GroupContext;

/// Result type used throughout groupbench
pub type Result<T> = anyhow::Result<T>;
