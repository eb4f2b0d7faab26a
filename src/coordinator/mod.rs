//! Coordinator module
//!
//! Group consensus on the run configuration before any collective work.
//!
//! The coordinator's configuration is the official one. Agreement is a
//! two-phase exchange:
//!
//! 1. the coordinator broadcasts its configuration and every member validates
//!    the identical copy
//! 2. the coordinator broadcasts its verdict, so all members accept or reject
//!    together
//!
//! On rejection the coordinator reports every violation, all members meet at
//! a barrier, and the group aborts. No member can be left waiting in a later
//! collective because its peers decided to stop.

use crate::error::{RunError, EXIT_FAILURE};
use crate::group::{GroupContext, COORDINATOR};
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;

/// Broadcast and validate a configuration across the group
///
/// The coordinator passes `Some(config)`, every other member `None`. `validate`
/// returns the list of violated constraints for a given group size; it runs
/// on every member against the broadcast copy. Returns the agreed
/// configuration, or [`RunError::Configuration`] on every member after the
/// group has been aborted.
pub fn agree_on_config<C, V>(ctx: &GroupContext, local: Option<C>, validate: V) -> Result<C>
where
    C: Serialize + DeserializeOwned,
    V: Fn(&C, usize) -> Vec<String>,
{
    let config: C = ctx.broadcast(local, COORDINATOR)?;
    let violations = validate(&config, ctx.size());

    let verdict = ctx.is_coordinator().then_some(violations.is_empty());
    let accepted = ctx.broadcast(verdict, COORDINATOR)?;
    if accepted {
        return Ok(config);
    }

    if ctx.is_coordinator() {
        error!("Invalid configuration:");
        for violation in &violations {
            error!("  - {}", violation);
        }
        error!(
            "Hint: choose a dataset size that is a positive multiple of the group size ({})",
            ctx.size()
        );
    }

    ctx.barrier()?;
    ctx.abort(EXIT_FAILURE);
    Err(RunError::Configuration { violations }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validator::validate_run_config;
    use crate::config::{RunConfig, ValueMode};
    use crate::error::exit_code_for;
    use crate::group::run_local_group;

    #[test]
    fn test_valid_config_reaches_every_member() {
        let config = RunConfig {
            dataset_size: 12,
            value_mode: ValueMode::Int,
            seed: Some(5),
            verbose: false,
        };
        let results = run_local_group(3, |ctx| {
            let local = ctx.is_coordinator().then(|| config.clone());
            agree_on_config(ctx, local, validate_run_config)
        });
        for result in results {
            assert_eq!(result.unwrap(), config);
        }
    }

    #[test]
    fn test_rejection_aborts_every_member() {
        let config = RunConfig {
            dataset_size: 7,
            ..RunConfig::default()
        };
        let results = run_local_group(4, |ctx| {
            let local = ctx.is_coordinator().then(|| config.clone());
            let agreed = agree_on_config(ctx, local, validate_run_config)?;
            // Unreachable on rejection; a member that got here would hang peers
            ctx.barrier()?;
            Ok(agreed)
        });

        for result in results {
            let err = result.unwrap_err();
            assert_eq!(exit_code_for(&err), EXIT_FAILURE);
        }
    }

    #[test]
    fn test_coordinator_reports_all_violations() {
        let config = RunConfig {
            dataset_size: -5,
            value_mode: ValueMode::from("nope"),
            ..RunConfig::default()
        };
        let results = run_local_group(4, |ctx| {
            let local = ctx.is_coordinator().then(|| config.clone());
            agree_on_config(ctx, local, validate_run_config)
        });

        let err = results.into_iter().next().unwrap().unwrap_err();
        match err.downcast_ref::<RunError>() {
            Some(RunError::Configuration { violations }) => assert_eq!(violations.len(), 4),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_members_follow_coordinator_verdict() {
        // Member 1 disagrees with the coordinator; the verdict still wins
        let results = run_local_group(2, |ctx| {
            let local = ctx.is_coordinator().then_some(10u32);
            agree_on_config(ctx, local, |_, _| {
                if ctx.rank() == 1 {
                    vec!["member-only objection".to_string()]
                } else {
                    Vec::new()
                }
            })
        });
        for result in results {
            assert_eq!(result.unwrap(), 10);
        }
    }
}
