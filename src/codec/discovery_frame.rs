// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Result, bail};

use crate::codec::header::{
    DISCOVERY_HEADER_LEN, DISCOVERY_RESPONSE_TYPE, build_discovery_header,
};

/// Byte offset at which a discovery response carries its null-terminated
/// device ID.
const DEVICE_ID_OFFSET: usize = 19;

/// Builds a discovery request frame: the 12-byte legacy header with the
/// discovery-request type word, followed by `deviceId` as ASCII and a
/// trailing null byte. `"*"` matches any device.
pub fn build_discovery_packet(device_id: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(DISCOVERY_HEADER_LEN + device_id.len() + 1);
    out.extend_from_slice(&build_discovery_header(crate::codec::header::DISCOVERY_REQUEST_TYPE));
    out.extend_from_slice(device_id.as_bytes());
    out.push(0);
    out
}

/// Parses a discovery response frame, returning the announced device ID.
///
/// Expects the response type word (`0x0080_0001`) in the first 4 bytes and
/// a null-terminated (or buffer-terminated) ASCII device ID starting at
/// byte offset 19.
pub fn parse_discovery_response(buf: &[u8]) -> Result<String> {
    if buf.len() < DEVICE_ID_OFFSET {
        bail!("discovery response too short: {} < {DEVICE_ID_OFFSET}", buf.len());
    }
    let type_word = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if type_word != DISCOVERY_RESPONSE_TYPE {
        bail!("not a discovery response: type word 0x{type_word:08x}");
    }

    let id_bytes = &buf[DEVICE_ID_OFFSET..];
    let end = id_bytes.iter().position(|&b| b == 0).unwrap_or(id_bytes.len());
    String::from_utf8(id_bytes[..end].to_vec())
        .map_err(|e| anyhow::anyhow!("device id is not valid ASCII/UTF-8: {e}"))
}
