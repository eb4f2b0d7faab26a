//! Per-member inbox with source/tag matching
//!
//! Transports push every inbound [`Packet`] into one crossbeam channel per
//! member. Receives name the `(source, tag)` they want; anything else that
//! arrives first is parked in an unexpected-message queue and handed out
//! later, in arrival order, to the receive that matches it.
//!
//! An abort packet poisons the mailbox: the receive in progress and every
//! later one fail with [`GroupError::Aborted`]. A closed notice marks one
//! source as gone; receives from it fail with [`GroupError::Disconnected`]
//! once everything it sent before closing has been consumed.

use super::protocol::{Packet, Tag};
use crate::error::GroupError;
use crossbeam::channel::Receiver;
use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};

pub struct Mailbox {
    inbox: Receiver<Packet>,
    unexpected: RefCell<VecDeque<(usize, Tag, Vec<u8>)>>,
    closed: RefCell<HashSet<usize>>,
    aborted: Cell<Option<i32>>,
}

impl Mailbox {
    pub fn new(inbox: Receiver<Packet>) -> Self {
        Self {
            inbox,
            unexpected: RefCell::new(VecDeque::new()),
            closed: RefCell::new(HashSet::new()),
            aborted: Cell::new(None),
        }
    }

    /// Abort code, if this mailbox has seen an abort
    pub fn aborted(&self) -> Option<i32> {
        self.aborted.get()
    }

    /// Mark the mailbox aborted (first code wins)
    pub fn poison(&self, code: i32) {
        if self.aborted.get().is_none() {
            self.aborted.set(Some(code));
        }
    }

    /// Block until a data packet from `source` with `tag` is available
    pub fn take(&self, source: usize, tag: Tag) -> Result<Vec<u8>, GroupError> {
        if let Some(code) = self.aborted.get() {
            return Err(GroupError::Aborted { code });
        }

        {
            let mut unexpected = self.unexpected.borrow_mut();
            if let Some(pos) = unexpected.iter().position(|(s, t, _)| *s == source && *t == tag) {
                if let Some((_, _, payload)) = unexpected.remove(pos) {
                    return Ok(payload);
                }
            }
        }

        if self.closed.borrow().contains(&source) {
            return Err(GroupError::Disconnected { peer: source });
        }

        loop {
            let packet = self
                .inbox
                .recv()
                .map_err(|_| GroupError::Disconnected { peer: source })?;

            match packet {
                Packet::Abort { source: from, code } => {
                    tracing::debug!(from, code, "abort received");
                    self.poison(code);
                    return Err(GroupError::Aborted { code });
                }
                Packet::Closed { source: gone } => {
                    tracing::debug!(peer = gone, "peer closed");
                    self.closed.borrow_mut().insert(gone);
                    if gone == source {
                        return Err(GroupError::Disconnected { peer: source });
                    }
                }
                Packet::Data { source: s, tag: t, payload } if s == source && t == tag => {
                    return Ok(payload);
                }
                Packet::Data { source: s, tag: t, payload } => {
                    self.unexpected.borrow_mut().push_back((s, t, payload));
                }
            }
        }
    }

    /// Number of parked, not yet matched messages
    pub fn unexpected_len(&self) -> usize {
        self.unexpected.borrow().len()
    }
}
