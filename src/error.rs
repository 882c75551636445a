// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

/// Error kinds produced by the tunnel protocol client.
///
/// Per-request variants (`ReadTimeout`, `WriteTimeout`) surface only to the
/// awaiting caller. Session-wide variants (`SocketError`, `ConnectTimeout`)
/// additionally drive a `disconnected` event out of the session.
#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("discovery timed out with no valid response")]
    DiscoveryTimeout,

    #[error("connect handshake timed out after {retries} retries")]
    ConnectTimeout { retries: u32 },

    #[error("session is not connected")]
    NotConnected,

    #[error("read request seq={seq} timed out")]
    ReadTimeout { seq: u16 },

    #[error("write request seq={seq} timed out")]
    WriteTimeout { seq: u16 },

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("value {raw} for {name} out of range [{min}, {max}]")]
    OutOfRange {
        name: String,
        raw: i32,
        min: i32,
        max: i32,
    },

    #[error("unknown setpoint: {name}")]
    UnknownSetpoint { name: String },

    #[error("socket error: {cause}")]
    SocketError { cause: String },
}
