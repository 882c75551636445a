// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use genvex_tunnel_client::session::sequence::{
    SEQ_INITIAL_PING, SEQ_KEEPALIVE_END, SEQ_KEEPALIVE_START, SequenceCounter,
};

#[test]
fn test_two_consecutive_user_requests_strictly_increase() {
    let seq = SequenceCounter::new();
    let a = seq.next_user_seq();
    let b = seq.next_user_seq();
    assert!(b > a);
}

#[test]
fn test_no_user_sequence_falls_in_reserved_ranges() {
    let seq = SequenceCounter::new();
    for _ in 0..5000 {
        let n = seq.next_user_seq();
        assert_ne!(n, SEQ_INITIAL_PING);
        assert!(!(SEQ_KEEPALIVE_START..=SEQ_KEEPALIVE_END).contains(&n));
    }
}
