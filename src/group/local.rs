//! In-process group
//!
//! Every member is an OS thread running the same closure; each member's inbox
//! is an unbounded crossbeam channel and every member holds a sender to every
//! inbox. Sends never block, receives block until a matching packet arrives.
//!
//! The runner enforces the group-wide failure rule: when a member's closure
//! returns an error or panics without having aborted, the runner aborts the
//! group on its behalf so no peer is left waiting forever.

use super::protocol::Packet;
use super::{GroupContext, Transport};
use crate::error::{GroupError, EXIT_FAILURE};
use anyhow::{anyhow, Result};
use crossbeam::channel::{unbounded, Sender};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Channel-backed transport shared by the members of one local group
pub struct LocalTransport {
    peers: Vec<Sender<Packet>>,
}

impl LocalTransport {
    pub fn new(peers: Vec<Sender<Packet>>) -> Self {
        Self { peers }
    }
}

impl Transport for LocalTransport {
    fn deliver(&self, dest: usize, packet: Packet) -> Result<(), GroupError> {
        let peer = self.peers.get(dest).ok_or(GroupError::InvalidRank {
            rank: dest,
            size: self.peers.len(),
        })?;
        peer.send(packet).map_err(|_| GroupError::Disconnected { peer: dest })
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Run `member` on every rank of a fresh `size`-member group
///
/// Returns one result per rank, in rank order, once every member has finished.
///
/// # Example
///
/// ```
/// use groupbench::group::{run_local_group, ReduceOp, COORDINATOR};
///
/// let results = run_local_group(3, |ctx| {
///     Ok(ctx.reduce(ctx.rank() as i64, ReduceOp::Sum, COORDINATOR)?)
/// });
/// assert_eq!(results[0].as_ref().unwrap(), &Some(3));
/// ```
pub fn run_local_group<T, F>(size: usize, member: F) -> Vec<Result<T>>
where
    T: Send,
    F: Fn(&GroupContext) -> Result<T> + Sync,
{
    let (senders, inboxes): (Vec<_>, Vec<_>) = (0..size).map(|_| unbounded::<Packet>()).unzip();

    std::thread::scope(|scope| {
        let handles: Vec<_> = inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| {
                let transport = LocalTransport::new(senders.clone());
                let member = &member;
                std::thread::Builder::new()
                    .name(format!("rank-{}", rank))
                    .spawn_scoped(scope, move || {
                        let ctx = GroupContext::new(rank, size, Box::new(transport), inbox);
                        run_member(&ctx, member)
                    })
            })
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(rank, handle)| match handle {
                Ok(handle) => handle
                    .join()
                    .unwrap_or_else(|_| Err(anyhow!("member {} thread failed to join", rank))),
                Err(e) => Err(anyhow!("failed to spawn member {}: {}", rank, e)),
            })
            .collect()
    })
}

/// Run one member, aborting the group if it fails on its own
fn run_member<T, F>(ctx: &GroupContext, member: &F) -> Result<T>
where
    F: Fn(&GroupContext) -> Result<T>,
{
    let span = tracing::info_span!("member", rank = ctx.rank());
    let _guard = span.enter();

    let outcome = catch_unwind(AssertUnwindSafe(|| member(ctx)))
        .unwrap_or_else(|_| Err(anyhow!("member {} panicked", ctx.rank())));

    if outcome.is_err() && ctx.aborted().is_none() {
        ctx.abort(EXIT_FAILURE);
    }
    outcome
}
