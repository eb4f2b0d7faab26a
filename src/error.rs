//! Error types
//!
//! Two families of typed errors live here:
//!
//! - [`GroupError`]: failures of the message-passing substrate (abort, lost peer,
//!   malformed payloads). Every primitive on [`crate::group::GroupContext`] returns it.
//! - [`RunError`]: protocol-level rejections raised by the pipelines
//!   (bad configuration, wrong group size).
//!
//! Application code above the pipelines works with `anyhow::Result` and uses
//! [`exit_code_for`] to turn an error chain into a process exit status.

use thiserror::Error;

/// Exit status used for every coordinated rejection
pub const EXIT_FAILURE: i32 = 1;

/// Failure of a group communication primitive
#[derive(Debug, Error)]
pub enum GroupError {
    /// The group was aborted by some member
    #[error("group aborted with exit code {code}")]
    Aborted { code: i32 },

    /// A peer's channel is gone (the peer exited or the connection dropped)
    #[error("peer {peer} disconnected")]
    Disconnected { peer: usize },

    /// Rank outside `[0, size)`
    #[error("rank {rank} is outside the group (size {size})")]
    InvalidRank { rank: usize, size: usize },

    /// A buffer or sequence length did not match what the operation requires
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// The root of a collective supplied no value
    #[error("root rank {root} supplied no value to a collective")]
    MissingRootValue { root: usize },

    /// Payload encoding or decoding failed
    #[error("payload codec error: {0}")]
    Codec(String),

    /// Transport I/O failure
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for GroupError {
    fn from(err: bincode::Error) -> Self {
        GroupError::Codec(err.to_string())
    }
}

/// Protocol-level rejection that ends a run group-wide
#[derive(Debug, Error)]
pub enum RunError {
    /// Run configuration violates one or more constraints
    #[error("invalid configuration: {}", .violations.join("; "))]
    Configuration { violations: Vec<String> },

    /// The pipeline needs a specific number of members
    #[error("{pipeline} requires exactly {required} group members, got {actual}")]
    Topology {
        pipeline: &'static str,
        required: usize,
        actual: usize,
    },

    /// A member was handed an empty partition
    #[error("member {rank} received an empty partition")]
    EmptyPartition { rank: usize },
}

/// Map an error chain to the process exit status
///
/// An abort carries its own code; every other failure exits with [`EXIT_FAILURE`].
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(GroupError::Aborted { code }) = cause.downcast_ref::<GroupError>() {
            return *code;
        }
    }
    EXIT_FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_code_from_abort() {
        let err: anyhow::Result<()> = Err(GroupError::Aborted { code: 7 }).context("barrier failed");
        assert_eq!(exit_code_for(&err.unwrap_err()), 7);
    }

    #[test]
    fn test_exit_code_default() {
        let err = anyhow::Error::new(RunError::EmptyPartition { rank: 2 });
        assert_eq!(exit_code_for(&err), EXIT_FAILURE);
    }

    #[test]
    fn test_configuration_error_lists_every_violation() {
        let err = RunError::Configuration {
            violations: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "invalid configuration: a; b");
    }
}
