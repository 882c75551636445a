// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use genvex_tunnel_client::codec::command::parse_datapoint_values;

#[test]
fn test_full_response_maps_positionally() {
    // keys = [A, B, C], response = [count=3, v1, v2, v3]
    let mut buf = vec![0x00, 0x03];
    buf.extend_from_slice(&10i16.to_be_bytes());
    buf.extend_from_slice(&20i16.to_be_bytes());
    buf.extend_from_slice(&30i16.to_be_bytes());

    let keys = ["A", "B", "C"];
    let values = parse_datapoint_values(&buf).expect("parse");
    let mapped: Vec<(&str, i16)> = keys.iter().copied().zip(values.iter().copied()).collect();

    assert_eq!(mapped, vec![("A", 10), ("B", 20), ("C", 30)]);
}

#[test]
fn test_short_response_leaves_surplus_keys_absent() {
    // count=3 declared, only 2 values actually present.
    let mut buf = vec![0x00, 0x03];
    buf.extend_from_slice(&10i16.to_be_bytes());
    buf.extend_from_slice(&20i16.to_be_bytes());

    let keys = ["A", "B", "C"];
    let values = parse_datapoint_values(&buf).expect("parse");
    assert_eq!(values.len(), 2);

    let mapped: Vec<(&str, i16)> = keys.iter().copied().zip(values.iter().copied()).collect();
    assert_eq!(mapped, vec![("A", 10), ("B", 20)]);
    assert!(keys.get(mapped.len()).is_some()); // "C" exists in keys but has no mapped value
}
