// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Result, bail};

/// Command tag bytes at the start of every command buffer:
/// `[0x00, 0x00, 0x00, cmd]`.
pub const CMD_PING: u8 = 0x11;
pub const CMD_DATAPOINT_READLIST: u8 = 0x2D;
pub const CMD_SETPOINT_READLIST: u8 = 0x2A;
pub const CMD_SETPOINT_WRITELIST: u8 = 0x2B;

fn command_tag(cmd: u8) -> [u8; 4] {
    [0x00, 0x00, 0x00, cmd]
}

/// Builds the `CMD_PING` command buffer: the 4-byte tag followed by the
/// ASCII bytes `"ping"`.
pub fn build_ping() -> Vec<u8> {
    let mut out = Vec::with_capacity(8);
    out.extend_from_slice(&command_tag(CMD_PING));
    out.extend_from_slice(b"ping");
    out
}

/// One entry of a datapoint read list: an object byte plus a 32-bit address.
#[derive(Debug, Clone, Copy)]
pub struct DatapointReadEntry {
    pub obj: u8,
    pub address: u32,
}

/// Builds the `CMD_DATAPOINT_READLIST` command buffer.
pub fn build_datapoint_readlist(entries: &[DatapointReadEntry]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 2 + entries.len() * 5 + 1);
    out.extend_from_slice(&command_tag(CMD_DATAPOINT_READLIST));
    out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    for e in entries {
        out.push(e.obj);
        out.extend_from_slice(&e.address.to_be_bytes());
    }
    out.push(0x01);
    out
}

/// One entry of a setpoint read list: an object byte plus a 16-bit address.
#[derive(Debug, Clone, Copy)]
pub struct SetpointReadEntry {
    pub obj: u8,
    pub address: u16,
}

/// Builds the `CMD_SETPOINT_READLIST` command buffer.
pub fn build_setpoint_readlist(entries: &[SetpointReadEntry]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 2 + entries.len() * 3 + 1);
    out.extend_from_slice(&command_tag(CMD_SETPOINT_READLIST));
    out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    for e in entries {
        out.push(e.obj);
        out.extend_from_slice(&e.address.to_be_bytes());
    }
    out.push(0x01);
    out
}

/// One entry of a setpoint write list: an id byte, a 32-bit value, and a
/// 16-bit parameter (the write address).
#[derive(Debug, Clone, Copy)]
pub struct SetpointWriteEntry {
    pub id: u8,
    pub value: i32,
    pub param: u16,
}

/// Builds the `CMD_SETPOINT_WRITELIST` command buffer.
pub fn build_setpoint_writelist(entries: &[SetpointWriteEntry]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 2 + entries.len() * 7 + 1);
    out.extend_from_slice(&command_tag(CMD_SETPOINT_WRITELIST));
    out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    for e in entries {
        out.push(e.id);
        out.extend_from_slice(&e.value.to_be_bytes());
        out.extend_from_slice(&e.param.to_be_bytes());
    }
    out.push(0x01);
    out
}

/// Parses a datapoint read-list response: `count:2` followed by `count`
/// signed 16-bit big-endian values, in request order. If the response
/// carries fewer values than requested, the surplus positions are simply
/// absent from the returned vector; the caller re-associates by index.
pub fn parse_datapoint_values(command_bytes: &[u8]) -> Result<Vec<i16>> {
    if command_bytes.len() < 2 {
        bail!("datapoint response too short for count field");
    }
    let count = u16::from_be_bytes([command_bytes[0], command_bytes[1]]) as usize;
    let available = (command_bytes.len() - 2) / 2;
    let n = count.min(available);

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let off = 2 + i * 2;
        out.push(i16::from_be_bytes([command_bytes[off], command_bytes[off + 1]]));
    }
    Ok(out)
}

/// Parses a setpoint read-list response: `skip:1` followed by `count:2`
/// followed by `count` unsigned 16-bit big-endian values, in request order.
pub fn parse_setpoint_values(command_bytes: &[u8]) -> Result<Vec<u16>> {
    if command_bytes.len() < 3 {
        bail!("setpoint response too short for skip+count fields");
    }
    let count = u16::from_be_bytes([command_bytes[1], command_bytes[2]]) as usize;
    let available = (command_bytes.len() - 3) / 2;
    let n = count.min(available);

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let off = 3 + i * 2;
        out.push(u16::from_be_bytes([command_bytes[off], command_bytes[off + 1]]));
    }
    Ok(out)
}

/// Model info extracted from a ping response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelInfo {
    pub device_number: u32,
    pub device_model: u32,
    pub slave_device_number: u32,
    pub slave_device_model: u32,
}

/// Parses a ping response's four 32-bit big-endian fields at offsets
/// 0, 4, 12, 16, defaulting any field whose bytes are unavailable to 0.
pub fn parse_ping_response(command_bytes: &[u8]) -> ModelInfo {
    let read_u32 = |offset: usize| -> u32 {
        if command_bytes.len() >= offset + 4 {
            u32::from_be_bytes([
                command_bytes[offset],
                command_bytes[offset + 1],
                command_bytes[offset + 2],
                command_bytes[offset + 3],
            ])
        } else {
            0
        }
    };

    ModelInfo {
        device_number: read_u32(0),
        device_model: read_u32(4),
        slave_device_number: read_u32(12),
        slave_device_model: read_u32(16),
    }
}
