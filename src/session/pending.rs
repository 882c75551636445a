// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::oneshot;

/// Table of outstanding requests keyed by sequence number.
///
/// Invariant: at most one entry per sequence number. An entry is removed
/// either when a matching response arrives (the dispatcher takes the
/// sender and fulfils it) or when the request's own timeout fires (the
/// caller removes its own entry before returning the timeout error).
#[derive(Clone, Default)]
pub struct PendingTable {
    inner: Arc<DashMap<u16, oneshot::Sender<Vec<u8>>>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new pending request, returning the receiving half.
    pub fn insert(&self, seq: u16) -> oneshot::Receiver<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        self.inner.insert(seq, tx);
        rx
    }

    /// Removes and returns the sender for `seq`, if still pending. Used
    /// both on response arrival and on caller-initiated timeout cleanup.
    pub fn remove(&self, seq: u16) -> Option<oneshot::Sender<Vec<u8>>> {
        self.inner.remove(&seq).map(|(_, tx)| tx)
    }

    /// Fulfils the pending entry for `seq` with `command_bytes`, if any.
    /// Returns `true` if a waiter was found and notified.
    pub fn resolve(&self, seq: u16, command_bytes: Vec<u8>) -> bool {
        match self.remove(seq) {
            Some(tx) => tx.send(command_bytes).is_ok(),
            None => false,
        }
    }

    /// Drains every pending entry, dropping their senders so that awaiting
    /// callers observe a closed channel (and time out locally, per the
    /// session's disconnect semantics).
    pub fn drain(&self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
