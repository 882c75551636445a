// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Result, bail};

/// `IPX` payload type: 17 zero bytes with a trailing `0x80` (rendezvous
/// disabled).
pub const IPX: u8 = 0x35;
/// `CP_ID` payload type: carries the client email.
pub const CP_ID: u8 = 0x3F;
/// `CRYPT` payload type: wraps a command buffer.
pub const CRYPT: u8 = 0x36;

/// Cleartext crypto code. This client supports no other value; a packet
/// declaring anything else is rejected with `ProtocolError`.
pub const CRYPTO_CODE_CLEARTEXT: u16 = 0x000A;

/// Builds one TLV block: `[type:1][flags:1][len:2][body…]`, where `len`
/// covers the 4 header bytes plus `body`.
pub fn build_tlv(type_: u8, flags: u8, body: &[u8]) -> Vec<u8> {
    let len = 4 + body.len() as u16;
    let mut out = Vec::with_capacity(len as usize);
    out.push(type_);
    out.push(flags);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(body);
    out
}

/// Parsed view of a TLV block header at some offset in a buffer.
#[derive(Debug, Clone, Copy)]
pub struct TlvHeader {
    pub type_: u8,
    pub flags: u8,
    pub len: u16,
}

/// Parses the 4-byte TLV header at `buf[offset..]`.
pub fn parse_tlv_header(buf: &[u8], offset: usize) -> Result<TlvHeader> {
    if buf.len() < offset + 4 {
        bail!("buffer too short for TLV header at offset {offset}");
    }
    Ok(TlvHeader {
        type_: buf[offset],
        flags: buf[offset + 1],
        len: u16::from_be_bytes([buf[offset + 2], buf[offset + 3]]),
    })
}

/// Builds the `IPX` payload: 17 bytes, all zero except a trailing `0x80`.
pub fn build_ipx_payload() -> Vec<u8> {
    let mut body = [0u8; 13];
    body[12] = 0x80;
    build_tlv(IPX, 0, &body)
}

/// Builds the `CP_ID` payload carrying the client email.
pub fn build_cp_id_payload(email: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(1 + email.len());
    body.push(0x01); // email ID type
    body.extend_from_slice(email.as_bytes());
    build_tlv(CP_ID, 0, &body)
}

/// Builds the `CRYPT` payload wrapping `command` in cleartext.
///
/// Body layout: `[cryptoCode:2][command bytes][0x02]`. The command bytes
/// start exactly 2 bytes into the body so that a DATA-response parser can
/// locate them at `tlvOffset + 4 + 2` without inspecting the length field.
pub fn build_crypt_payload(command: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(2 + command.len() + 1);
    body.extend_from_slice(&CRYPTO_CODE_CLEARTEXT.to_be_bytes());
    body.extend_from_slice(command);
    body.push(0x02);
    build_tlv(CRYPT, 0, &body)
}

/// Locates the `CRYPT` payload in a DATA packet's payload area and extracts
/// its wrapped command bytes.
///
/// `crypt_offset` is 16 normally, or 18 when the header's `TAG` flag is set
/// (a 2-byte frame-control tag is inserted between the header and the first
/// payload in that case). The end offset is clamped to `buf.len()` because
/// the declared length occasionally overruns by the trailing checksum size.
pub fn extract_command_bytes<'a>(buf: &'a [u8], crypt_offset: usize) -> Result<&'a [u8]> {
    let hdr = parse_tlv_header(buf, crypt_offset)?;
    if hdr.type_ != CRYPT {
        bail!("expected CRYPT payload (0x{CRYPT:02x}), found 0x{:02x}", hdr.type_);
    }
    let body_start = crypt_offset + 4;
    if buf.len() < body_start + 2 {
        bail!("buffer too short for CRYPT cryptoCode");
    }
    let crypto_code = u16::from_be_bytes([buf[body_start], buf[body_start + 1]]);
    if crypto_code != CRYPTO_CODE_CLEARTEXT {
        bail!("unsupported cryptoCode 0x{crypto_code:04x}, only cleartext is implemented");
    }

    let command_start = crypt_offset + 6;
    let declared_end = crypt_offset + 4 + hdr.len as usize;
    let end = declared_end.min(buf.len());
    if command_start > end {
        bail!("CRYPT payload too short to contain any command bytes");
    }
    Ok(&buf[command_start..end])
}
