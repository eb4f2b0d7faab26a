//! Group communication substrate
//!
//! A group is a fixed set of `size` members, each identified by a rank in
//! `[0, size)`. Every member runs the same program (SPMD) and coordinates with
//! the others only through the primitives on [`GroupContext`]:
//!
//! - **Collectives**: [`broadcast`](GroupContext::broadcast),
//!   [`scatter_equal_chunks`](GroupContext::scatter_equal_chunks),
//!   [`reduce`](GroupContext::reduce), [`barrier`](GroupContext::barrier).
//!   Every member must call them in the same order with matching types.
//! - **Point-to-point**: [`send`](GroupContext::send) /
//!   [`receive`](GroupContext::receive) of fixed-size byte buffers, matched by
//!   source and tag.
//! - **Abort**: [`abort`](GroupContext::abort) poisons the whole group.
//!
//! All primitives block the caller until their part of the exchange is done.
//! There are no timeouts: a member that never arrives leaves its peers waiting.
//!
//! # Transports
//!
//! - `local`: members are threads in one process (crossbeam channels)
//! - `tcp`: members are processes connected by a TCP mesh
//!
//! Both only move [`Packet`]s; matching and the collective algorithms live here.

pub mod local;
pub mod mailbox;
pub mod protocol;
pub mod tcp;

use crate::error::GroupError;
use crossbeam::channel::Receiver;
use mailbox::Mailbox;
use protocol::{Packet, Tag};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use local::run_local_group;
pub use tcp::TcpTransport;

/// Rank that originates configuration, owns the dataset and receives reductions
pub const COORDINATOR: usize = 0;

/// Outbound half of a transport
///
/// Inbound packets for a member arrive on the receiver handed to
/// [`GroupContext::new`]; the transport only has to deliver outbound ones.
pub trait Transport: Send {
    /// Deliver a packet to member `dest` (may be the sender itself)
    fn deliver(&self, dest: usize, packet: Packet) -> Result<(), GroupError>;

    /// Short transport name for diagnostics
    fn name(&self) -> &'static str;

    /// Largest payload a single packet may carry
    fn max_payload_len(&self) -> usize {
        usize::MAX
    }
}

/// Reduction operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    Min,
    Max,
    Sum,
}

/// Value that can be combined by [`GroupContext::reduce`]
///
/// `combine` must be associative and commutative for every operator.
pub trait Reducible: Copy + Serialize + DeserializeOwned {
    fn combine(self, other: Self, op: ReduceOp) -> Self;
}

impl Reducible for f64 {
    fn combine(self, other: Self, op: ReduceOp) -> Self {
        match op {
            ReduceOp::Min => self.min(other),
            ReduceOp::Max => self.max(other),
            ReduceOp::Sum => self + other,
        }
    }
}

macro_rules! impl_reducible_int {
    ($($t:ty),*) => {
        $(
            impl Reducible for $t {
                fn combine(self, other: Self, op: ReduceOp) -> Self {
                    match op {
                        ReduceOp::Min => Ord::min(self, other),
                        ReduceOp::Max => Ord::max(self, other),
                        // Callers widen before summing; wrap instead of panicking
                        ReduceOp::Sum => self.wrapping_add(other),
                    }
                }
            }
        )*
    };
}

impl_reducible_int!(i32, i64, u64);

/// One member's handle on the group
pub struct GroupContext {
    rank: usize,
    size: usize,
    transport: Box<dyn Transport>,
    mailbox: Mailbox,
}

impl GroupContext {
    /// Create a member handle
    ///
    /// `inbox` must receive every packet any transport delivers to `rank`.
    pub fn new(rank: usize, size: usize, transport: Box<dyn Transport>, inbox: Receiver<Packet>) -> Self {
        Self {
            rank,
            size,
            transport,
            mailbox: Mailbox::new(inbox),
        }
    }

    /// This member's rank
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of members in the group
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_coordinator(&self) -> bool {
        self.rank == COORDINATOR
    }

    /// Exit code of the abort this member has observed, if any
    pub fn aborted(&self) -> Option<i32> {
        self.mailbox.aborted()
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Every member receives the root's value
    ///
    /// The root must pass `Some`; values passed by other members are ignored.
    pub fn broadcast<T>(&self, value: Option<T>, root: usize) -> Result<T, GroupError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.check_rank(root)?;
        self.check_live()?;

        if self.rank == root {
            let value = value.ok_or(GroupError::MissingRootValue { root })?;
            let payload = bincode::serialize(&value)?;
            for dest in self.peers() {
                self.post(dest, Tag::Broadcast, payload.clone())?;
            }
            Ok(value)
        } else {
            let payload = self.mailbox.take(root, Tag::Broadcast)?;
            Ok(bincode::deserialize(&payload)?)
        }
    }

    /// Split the root's sequence into `size` contiguous chunks of `chunk_size`
    ///
    /// Member `r` receives elements `[r * chunk_size, (r + 1) * chunk_size)`.
    /// Only the root supplies `full`, which must hold exactly
    /// `chunk_size * size` elements.
    pub fn scatter_equal_chunks<T>(&self, full: Option<&[T]>, chunk_size: usize, root: usize) -> Result<Vec<T>, GroupError>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        self.check_rank(root)?;
        self.check_live()?;

        if self.rank == root {
            let full = full.ok_or(GroupError::MissingRootValue { root })?;
            let expected = chunk_size.saturating_mul(self.size);
            if full.len() != expected {
                return Err(GroupError::LengthMismatch {
                    expected,
                    actual: full.len(),
                });
            }

            let mut own = Vec::new();
            for member in 0..self.size {
                let chunk = &full[member * chunk_size..(member + 1) * chunk_size];
                if member == root {
                    own = chunk.to_vec();
                } else {
                    self.post_split(member, Tag::Scatter, bincode::serialize(chunk)?)?;
                }
            }
            Ok(own)
        } else {
            let payload = self.take_split(root, Tag::Scatter)?;
            let chunk: Vec<T> = bincode::deserialize(&payload)?;
            if chunk.len() != chunk_size {
                return Err(GroupError::LengthMismatch {
                    expected: chunk_size,
                    actual: chunk.len(),
                });
            }
            Ok(chunk)
        }
    }

    /// Combine every member's `local` with `op`; only the root gets the result
    ///
    /// The root folds contributions in rank order, so the result is
    /// deterministic for a given group size.
    pub fn reduce<T>(&self, local: T, op: ReduceOp, root: usize) -> Result<Option<T>, GroupError>
    where
        T: Reducible,
    {
        self.check_rank(root)?;
        self.check_live()?;

        if self.rank != root {
            self.post(root, Tag::Reduce, bincode::serialize(&local)?)?;
            return Ok(None);
        }

        let mut acc: Option<T> = None;
        for member in 0..self.size {
            let value = if member == root {
                local
            } else {
                let payload = self.mailbox.take(member, Tag::Reduce)?;
                bincode::deserialize(&payload)?
            };
            acc = Some(match acc {
                Some(current) => current.combine(value, op),
                None => value,
            });
        }
        Ok(acc)
    }

    /// Block until every member has entered the barrier
    pub fn barrier(&self) -> Result<(), GroupError> {
        self.check_live()?;

        if self.rank == COORDINATOR {
            for member in self.peers() {
                self.mailbox.take(member, Tag::Barrier)?;
            }
            for member in self.peers() {
                self.post(member, Tag::Barrier, Vec::new())?;
            }
        } else {
            self.post(COORDINATOR, Tag::Barrier, Vec::new())?;
            self.mailbox.take(COORDINATOR, Tag::Barrier)?;
        }
        Ok(())
    }

    /// Send `buf` to `dest` under `tag`
    pub fn send(&self, buf: &[u8], dest: usize, tag: u32) -> Result<(), GroupError> {
        self.check_rank(dest)?;
        self.check_live()?;
        self.post(dest, Tag::User(tag), buf.to_vec())
    }

    /// Receive exactly `buf.len()` bytes from `source` under `tag`
    pub fn receive(&self, buf: &mut [u8], source: usize, tag: u32) -> Result<(), GroupError> {
        self.check_rank(source)?;
        let payload = self.mailbox.take(source, Tag::User(tag))?;
        if payload.len() != buf.len() {
            return Err(GroupError::LengthMismatch {
                expected: buf.len(),
                actual: payload.len(),
            });
        }
        buf.copy_from_slice(&payload);
        Ok(())
    }

    /// Terminate the whole group with `code`
    ///
    /// Every other member is sent an abort notice; whatever they are blocked
    /// on (or call next) fails with [`GroupError::Aborted`]. Returns the error
    /// for the caller to propagate.
    pub fn abort(&self, code: i32) -> GroupError {
        tracing::debug!(code, "aborting group");
        self.mailbox.poison(code);
        for dest in self.peers() {
            // Peers that already exited cannot be notified and do not need to be
            let _ = self.transport.deliver(dest, Packet::Abort { source: self.rank, code });
        }
        GroupError::Aborted {
            code: self.mailbox.aborted().unwrap_or(code),
        }
    }

    fn peers(&self) -> impl Iterator<Item = usize> {
        let rank = self.rank;
        (0..self.size).filter(move |&member| member != rank)
    }

    fn post(&self, dest: usize, tag: Tag, payload: Vec<u8>) -> Result<(), GroupError> {
        self.transport.deliver(
            dest,
            Packet::Data {
                source: self.rank,
                tag,
                payload,
            },
        )
    }

    /// Post `payload` as a length packet followed by pieces the transport can carry
    fn post_split(&self, dest: usize, tag: Tag, payload: Vec<u8>) -> Result<(), GroupError> {
        let limit = self.transport.max_payload_len().max(1);
        self.post(dest, tag, bincode::serialize(&(payload.len() as u64))?)?;
        if payload.is_empty() {
            return Ok(());
        }
        if payload.len() <= limit {
            return self.post(dest, tag, payload);
        }
        for piece in payload.chunks(limit) {
            self.post(dest, tag, piece.to_vec())?;
        }
        Ok(())
    }

    /// Reassemble a payload sent with [`post_split`](Self::post_split)
    fn take_split(&self, source: usize, tag: Tag) -> Result<Vec<u8>, GroupError> {
        let total: u64 = bincode::deserialize(&self.mailbox.take(source, tag)?)?;
        let total = total as usize;

        let mut payload = Vec::new();
        while payload.len() < total {
            let piece = self.mailbox.take(source, tag)?;
            if piece.is_empty() {
                break;
            }
            if payload.is_empty() && piece.len() == total {
                return Ok(piece);
            }
            payload.extend_from_slice(&piece);
        }
        if payload.len() != total {
            return Err(GroupError::LengthMismatch {
                expected: total,
                actual: payload.len(),
            });
        }
        Ok(payload)
    }

    fn check_rank(&self, rank: usize) -> Result<(), GroupError> {
        if rank >= self.size {
            return Err(GroupError::InvalidRank { rank, size: self.size });
        }
        Ok(())
    }

    fn check_live(&self) -> Result<(), GroupError> {
        match self.mailbox.aborted() {
            Some(code) => Err(GroupError::Aborted { code }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_reaches_every_member() {
        let results = run_local_group(5, |ctx| {
            let local = ctx.is_coordinator().then(|| vec![3u64, 1, 4]);
            Ok(ctx.broadcast(local, COORDINATOR)?)
        });

        assert_eq!(results.len(), 5);
        for result in results {
            assert_eq!(result.unwrap(), vec![3, 1, 4]);
        }
    }

    #[test]
    fn test_broadcast_from_non_zero_root() {
        let results = run_local_group(3, |ctx| {
            let local = (ctx.rank() == 2).then(|| "from two".to_string());
            Ok(ctx.broadcast(local, 2)?)
        });
        for result in results {
            assert_eq!(result.unwrap(), "from two");
        }
    }

    #[test]
    fn test_broadcast_without_root_value_fails_group() {
        let results = run_local_group(2, |ctx| Ok(ctx.broadcast::<u32>(None, COORDINATOR)?));
        assert!(results.iter().all(|r| r.is_err()));
    }

    #[test]
    fn test_scatter_equal_chunks_in_rank_order() {
        let data: Vec<i32> = (0..12).collect();
        let results = run_local_group(4, |ctx| {
            let full = ctx.is_coordinator().then_some(data.as_slice());
            Ok(ctx.scatter_equal_chunks(full, 3, COORDINATOR)?)
        });

        let chunks: Vec<Vec<i32>> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(chunks[0], vec![0, 1, 2]);
        assert_eq!(chunks[3], vec![9, 10, 11]);
        assert_eq!(chunks.concat(), data);
    }

    /// Local transport that refuses data packets larger than `limit`
    struct CappedTransport {
        inner: local::LocalTransport,
        limit: usize,
    }

    impl Transport for CappedTransport {
        fn deliver(&self, dest: usize, packet: Packet) -> Result<(), GroupError> {
            if let Packet::Data { payload, .. } = &packet {
                if payload.len() > self.limit {
                    return Err(GroupError::LengthMismatch {
                        expected: self.limit,
                        actual: payload.len(),
                    });
                }
            }
            self.inner.deliver(dest, packet)
        }

        fn name(&self) -> &'static str {
            "capped"
        }

        fn max_payload_len(&self) -> usize {
            self.limit
        }
    }

    fn run_capped_group<T, F>(size: usize, limit: usize, member: F) -> Vec<Result<T, GroupError>>
    where
        T: Send,
        F: Fn(&GroupContext) -> Result<T, GroupError> + Sync,
    {
        let (senders, inboxes): (Vec<_>, Vec<_>) = (0..size).map(|_| crossbeam::channel::unbounded()).unzip();
        std::thread::scope(|scope| {
            let handles: Vec<_> = inboxes
                .into_iter()
                .enumerate()
                .map(|(rank, inbox)| {
                    let transport = CappedTransport {
                        inner: local::LocalTransport::new(senders.clone()),
                        limit,
                    };
                    let member = &member;
                    scope.spawn(move || member(&GroupContext::new(rank, size, Box::new(transport), inbox)))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
    }

    #[test]
    fn test_scatter_splits_chunks_larger_than_transport_limit() {
        let first: Vec<i64> = (0..40).collect();
        let second: Vec<i64> = (100..104).collect();

        // Each 20-element chunk encodes to 168 bytes, far above the 10-byte limit
        let results = run_capped_group(2, 10, |ctx| {
            let root = ctx.is_coordinator();
            let a = ctx.scatter_equal_chunks(root.then_some(first.as_slice()), 20, COORDINATOR)?;
            let b = ctx.scatter_equal_chunks(root.then_some(second.as_slice()), 2, COORDINATOR)?;
            Ok((a, b))
        });

        let results: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(results[0], ((0..20).collect(), vec![100, 101]));
        assert_eq!(results[1], ((20..40).collect(), vec![102, 103]));
    }

    #[test]
    fn test_scatter_rejects_wrong_length() {
        let data = vec![1.0f64; 7];
        let results = run_local_group(2, |ctx| {
            let full = ctx.is_coordinator().then_some(data.as_slice());
            Ok(ctx.scatter_equal_chunks(full, 4, COORDINATOR)?)
        });
        assert!(results.iter().all(|r| r.is_err()));
    }

    #[test]
    fn test_reduce_only_root_receives() {
        let results = run_local_group(4, |ctx| {
            let value = ctx.rank() as i64 * 10 - 5;
            let min = ctx.reduce(value, ReduceOp::Min, COORDINATOR)?;
            let max = ctx.reduce(value, ReduceOp::Max, COORDINATOR)?;
            let sum = ctx.reduce(value, ReduceOp::Sum, COORDINATOR)?;
            Ok((min, max, sum))
        });

        let results: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(results[0], (Some(-5), Some(25), Some(40)));
        for other in &results[1..] {
            assert_eq!(*other, (None, None, None));
        }
    }

    #[test]
    fn test_reduce_floats() {
        let results = run_local_group(3, |ctx| {
            let value = [2.5f64, -1.0, 7.25][ctx.rank()];
            Ok((
                ctx.reduce(value, ReduceOp::Min, COORDINATOR)?,
                ctx.reduce(value, ReduceOp::Sum, COORDINATOR)?,
            ))
        });
        let root = results.into_iter().next().unwrap().unwrap();
        assert_eq!(root, (Some(-1.0), Some(8.75)));
    }

    #[test]
    fn test_barrier_and_point_to_point() {
        let results = run_local_group(3, |ctx| {
            ctx.barrier()?;
            let next = (ctx.rank() + 1) % ctx.size();
            let prev = (ctx.rank() + ctx.size() - 1) % ctx.size();
            ctx.send(&[ctx.rank() as u8; 4], next, 7)?;
            let mut buf = [0u8; 4];
            ctx.receive(&mut buf, prev, 7)?;
            ctx.barrier()?;
            Ok(buf[0] as usize)
        });

        let received: Vec<usize> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(received, vec![2, 0, 1]);
    }

    #[test]
    fn test_receive_length_mismatch() {
        let results = run_local_group(2, |ctx| {
            if ctx.is_coordinator() {
                ctx.send(&[1, 2, 3], 1, 1)?;
                ctx.barrier()?;
            } else {
                let mut buf = [0u8; 2];
                ctx.receive(&mut buf, 0, 1)?;
            }
            Ok(())
        });
        let member = results[1].as_ref().unwrap_err();
        assert!(matches!(
            member.downcast_ref::<GroupError>(),
            Some(GroupError::LengthMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_invalid_rank_rejected() {
        let results = run_local_group(1, |ctx| Ok(ctx.send(&[0], 1, 0)?));
        assert!(matches!(
            results[0].as_ref().unwrap_err().downcast_ref::<GroupError>(),
            Some(GroupError::InvalidRank { rank: 1, size: 1 })
        ));
    }

    #[test]
    fn test_abort_releases_blocked_members() {
        let results = run_local_group(4, |ctx| {
            if ctx.rank() == 3 {
                return Err(ctx.abort(42).into());
            }
            // Everyone else waits on a barrier that can never complete
            ctx.barrier()?;
            Ok(())
        });

        for result in results {
            let err = result.unwrap_err();
            assert_eq!(crate::error::exit_code_for(&err), 42);
        }
    }

    #[test]
    fn test_single_member_group() {
        let results = run_local_group(1, |ctx| {
            let value = ctx.broadcast(Some(11u32), COORDINATOR)?;
            let chunk = ctx.scatter_equal_chunks(Some(&[1i32, 2][..]), 2, COORDINATOR)?;
            ctx.barrier()?;
            let sum = ctx.reduce(5i32, ReduceOp::Sum, COORDINATOR)?;
            Ok((value, chunk, sum))
        });
        assert_eq!(results[0].as_ref().unwrap(), &(11, vec![1, 2], Some(5)));
    }

    #[test]
    fn test_integer_combine() {
        assert_eq!(3i32.combine(-4, ReduceOp::Min), -4);
        assert_eq!(3i32.combine(-4, ReduceOp::Max), 3);
        assert_eq!(i32::MAX.combine(1, ReduceOp::Sum), i32::MIN);
        assert_eq!(10u64.combine(5, ReduceOp::Sum), 15);
    }
}
