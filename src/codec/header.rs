// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Result, bail};
use bitflags::bitflags;
use zerocopy::{BigEndian, FromBytes, Immutable, IntoBytes, KnownLayout, U16, U32};

/// Size in bytes of the regular (post-discovery) tunnel header.
pub const HEADER_LEN: usize = 16;
/// Size in bytes of the legacy discovery header.
pub const DISCOVERY_HEADER_LEN: usize = 12;

/// Discovery request type word (4-byte big-endian, followed by 8 zero bytes).
pub const DISCOVERY_REQUEST_TYPE: u32 = 0x0000_0001;
/// Discovery response type word: the request type with the response bit
/// (`0x0080_0000`) OR'd in.
pub const DISCOVERY_RESPONSE_TYPE: u32 = 0x0080_0001;

/// Packet type byte at header offset 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    UConnect = 0x83,
    Data = 0x16,
    UAlive = 0x82,
}

impl PacketType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x83 => Some(PacketType::UConnect),
            0x16 => Some(PacketType::Data),
            0x82 => Some(PacketType::UAlive),
            _ => None,
        }
    }
}

bitflags! {
    /// Flags byte at header offset 11.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HeaderFlags: u8 {
        const RESPONSE = 0x01;
        const EXCEPTION = 0x02;
        const TAG = 0x40;
        const NSI_CO = 0x80;
    }
}

/// The regular 16-byte tunnel header, wire layout:
///
/// | Offset | Size | Field |
/// |---|---|---|
/// | 0  | 4 | clientId (big-endian) |
/// | 4  | 4 | serverId (big-endian) |
/// | 8  | 1 | packet type |
/// | 9  | 1 | version (always 0x02) |
/// | 10 | 1 | retransmit / reserved |
/// | 11 | 1 | flags |
/// | 12 | 2 | sequence id (big-endian) |
/// | 14 | 2 | total length including header (big-endian) |
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct RegularHeader {
    pub client_id: U32<BigEndian>,
    pub server_id: U32<BigEndian>,
    pub packet_type: u8,
    pub version: u8,
    pub retransmit: u8,
    pub flags: u8,
    pub seq_id: U16<BigEndian>,
    pub length: U16<BigEndian>,
}

/// Protocol version carried in every regular header.
pub const PROTOCOL_VERSION: u8 = 0x02;

/// Builds the 16-byte regular header. `packet_type` and `flags` are taken as
/// raw bytes so that any value round-trips through [`parse_header`], not
/// just the named [`PacketType`]/[`HeaderFlags`] variants.
pub fn build_header(
    client_id: u32,
    server_id: u32,
    packet_type: u8,
    flags: u8,
    seq_id: u16,
    length: u16,
) -> [u8; HEADER_LEN] {
    let hdr = RegularHeader {
        client_id: client_id.into(),
        server_id: server_id.into(),
        packet_type,
        version: PROTOCOL_VERSION,
        retransmit: 0,
        flags,
        seq_id: seq_id.into(),
        length: length.into(),
    };
    let mut buf = [0u8; HEADER_LEN];
    buf.copy_from_slice(hdr.as_bytes());
    buf
}

/// Parses a 16-byte regular header, returning
/// `(clientId, serverId, packetType, flags, seqId, length)`.
pub fn parse_header(buf: &[u8]) -> Result<(u32, u32, u8, u8, u16, u16)> {
    if buf.len() < HEADER_LEN {
        bail!("header buffer too short: {} < {HEADER_LEN}", buf.len());
    }
    let hdr = RegularHeader::ref_from_bytes(&buf[..HEADER_LEN])
        .map_err(|e| anyhow::anyhow!("failed to parse regular header: {e}"))?;
    Ok((
        hdr.client_id.get(),
        hdr.server_id.get(),
        hdr.packet_type,
        hdr.flags,
        hdr.seq_id.get(),
        hdr.length.get(),
    ))
}

/// Builds the 12-byte legacy discovery header: a 4-byte big-endian type word
/// followed by 8 zero bytes.
pub fn build_discovery_header(type_word: u32) -> [u8; DISCOVERY_HEADER_LEN] {
    let mut buf = [0u8; DISCOVERY_HEADER_LEN];
    buf[0..4].copy_from_slice(&type_word.to_be_bytes());
    buf
}

/// Parses the 4-byte discovery type word from the start of `buf`.
pub fn parse_discovery_type(buf: &[u8]) -> Result<u32> {
    if buf.len() < 4 {
        bail!("discovery header too short: {} < 4", buf.len());
    }
    Ok(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
}
