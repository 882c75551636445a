// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::pin::Pin;
use std::time::Duration;

use anyhow::{Result, bail};
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::codec::header::{HEADER_LEN, HeaderFlags, PacketType, build_header, parse_header};
use crate::codec::tlv::{build_cp_id_payload, build_ipx_payload};
use crate::error::TunnelError;
use crate::state_machine::common::{StateMachine, Transition};

/// Sequence number carried by every U_CONNECT attempt.
const CONNECT_SEQ: u16 = 0;

/// Context shared across handshake attempts: a socket already `connect()`ed
/// to the remote device, the locally generated client id, and the retry
/// policy.
pub struct ConnectCtx<'a> {
    pub socket: &'a UdpSocket,
    pub client_id: u32,
    pub email: String,
    pub max_retries: u32,
    pub retry_interval: Duration,
}

/// Retransmitting U_CONNECT handshake. One `step` is one send-then-wait
/// attempt; the driving loop keeps calling `step` while it returns
/// [`Transition::Stay`], and stops at the first [`Transition::Done`].
pub struct ConnectHandshake {
    attempt: u32,
}

impl ConnectHandshake {
    pub fn new() -> Self {
        ConnectHandshake { attempt: 0 }
    }
}

impl Default for ConnectHandshake {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine<ConnectCtx<'_>, Transition<(), Result<u32>>> for ConnectHandshake {
    type StepResult<'a>
        = Pin<Box<dyn Future<Output = Transition<(), Result<u32>>> + Send + 'a>>
    where
        Self: 'a;

    fn step<'a>(&'a mut self, ctx: &'a mut ConnectCtx<'_>) -> Self::StepResult<'a> {
        Box::pin(async move {
            if self.attempt > ctx.max_retries {
                return Transition::Done(Err(TunnelError::ConnectTimeout {
                    retries: ctx.max_retries,
                }
                .into()));
            }

            let frame = build_u_connect(ctx.client_id, &ctx.email, self.attempt > 0);
            if let Err(e) = ctx.socket.send(&frame).await {
                return Transition::Done(Err(e.into()));
            }

            let mut buf = [0u8; 512];
            let recv = timeout(ctx.retry_interval, ctx.socket.recv(&mut buf)).await;
            self.attempt += 1;

            match recv {
                Ok(Ok(n)) => match parse_u_connect_response(&buf[..n]) {
                    Ok(server_id) => Transition::Done(Ok(server_id)),
                    Err(_) => Transition::Stay(()),
                },
                Ok(Err(e)) => Transition::Done(Err(e.into())),
                Err(_) => Transition::Stay(()),
            }
        })
    }
}

fn build_u_connect(client_id: u32, email: &str, retransmit: bool) -> Vec<u8> {
    let ipx = build_ipx_payload();
    let cp_id = build_cp_id_payload(email);
    let length = (HEADER_LEN + ipx.len() + cp_id.len()) as u16;

    let mut frame = build_header(
        client_id,
        0,
        PacketType::UConnect as u8,
        if retransmit { 0 } else { 0 },
        CONNECT_SEQ,
        length,
    )
    .to_vec();
    // retransmit byte sits at header offset 10; build_header always writes 0
    // there, so flip it in place for retried attempts.
    if retransmit {
        frame[10] = 1;
    }
    frame.extend_from_slice(&ipx);
    frame.extend_from_slice(&cp_id);
    frame
}

/// Byte offset of the 32-bit acceptance status within a U_CONNECT response.
const STATUS_OFFSET: usize = 20;
/// Byte offset of the 32-bit server nonce within a U_CONNECT response.
const SERVER_NONCE_OFFSET: usize = 24;
/// Acceptance status value; anything else means the device rejected the
/// request.
const STATUS_ACCEPTED: u32 = 0x0000_0001;

/// Validates a U_CONNECT response: must carry the `RESPONSE` flag, be at
/// least 28 bytes, and declare acceptance at bytes 20-23. The server nonce
/// is read from bytes 24-27, not from the header's `serverId` field (which
/// the device leaves at whatever it echoed).
fn parse_u_connect_response(buf: &[u8]) -> Result<u32> {
    let (_, _, packet_type, flags, _, _) = parse_header(buf)?;
    if PacketType::from_u8(packet_type) != Some(PacketType::UConnect) {
        bail!("not a U_CONNECT response");
    }
    if flags & HeaderFlags::RESPONSE.bits() == 0 {
        bail!("U_CONNECT response missing RESPONSE flag");
    }
    if flags & HeaderFlags::EXCEPTION.bits() != 0 {
        bail!("device rejected U_CONNECT");
    }
    if buf.len() < SERVER_NONCE_OFFSET + 4 {
        bail!("U_CONNECT response too short: {} < {}", buf.len(), SERVER_NONCE_OFFSET + 4);
    }

    let status = u32::from_be_bytes(buf[STATUS_OFFSET..STATUS_OFFSET + 4].try_into().expect("4 bytes"));
    if status != STATUS_ACCEPTED {
        bail!("device rejected U_CONNECT with status 0x{status:08x}");
    }

    let server_id = u32::from_be_bytes(
        buf[SERVER_NONCE_OFFSET..SERVER_NONCE_OFFSET + 4].try_into().expect("4 bytes"),
    );
    if server_id == 0 {
        bail!("device assigned server id 0");
    }
    Ok(server_id)
}
