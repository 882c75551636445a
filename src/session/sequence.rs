// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::atomic::{AtomicU16, Ordering};

/// Sequence number reserved for the initial post-connect ping.
pub const SEQ_INITIAL_PING: u16 = 50;
/// Start (inclusive) of the keep-alive sequence ring.
pub const SEQ_KEEPALIVE_START: u16 = 100;
/// End (inclusive) of the keep-alive sequence ring.
pub const SEQ_KEEPALIVE_END: u16 = 199;
/// First sequence number allocated to user requests.
pub const SEQ_USER_START: u16 = 300;

/// Allocates sequence numbers for one session: a monotonic counter for user
/// requests starting at 300 (wrapping back to 300 past `u16::MAX`), and an
/// independent ring of keep-alive sequence numbers in `[100, 199]`.
pub struct SequenceCounter {
    next_user: AtomicU16,
    next_keepalive: AtomicU16,
}

impl SequenceCounter {
    pub fn new() -> Self {
        SequenceCounter {
            next_user: AtomicU16::new(SEQ_USER_START),
            next_keepalive: AtomicU16::new(SEQ_KEEPALIVE_START),
        }
    }

    /// Allocates the next user-request sequence number.
    pub fn next_user_seq(&self) -> u16 {
        self.next_user
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                Some(if cur == u16::MAX { SEQ_USER_START } else { cur + 1 })
            })
            .unwrap_or(SEQ_USER_START)
    }

    /// Allocates the next keep-alive sequence number from the 100-199 ring.
    pub fn next_keepalive_seq(&self) -> u16 {
        self.next_keepalive
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                Some(if cur >= SEQ_KEEPALIVE_END {
                    SEQ_KEEPALIVE_START
                } else {
                    cur + 1
                })
            })
            .unwrap_or(SEQ_KEEPALIVE_START)
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}
