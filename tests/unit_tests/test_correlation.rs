// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use genvex_tunnel_client::session::pending::PendingTable;

#[test]
fn test_response_with_no_matching_pending_entry_has_no_side_effects() {
    let table = PendingTable::new();
    let _rx = table.insert(300);

    // A reply for an unrelated sequence number must not disturb seq 300's
    // entry nor spuriously resolve it.
    assert!(!table.resolve(301, vec![0xAA]));
    assert_eq!(table.len(), 1);

    assert!(table.resolve(300, vec![0xBB]));
    assert!(table.is_empty());
}
