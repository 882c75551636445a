// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

#![allow(dead_code)]

use genvex_tunnel_client::codec::checksum;
use genvex_tunnel_client::codec::command::{self};
use genvex_tunnel_client::codec::header::{
    HEADER_LEN, HeaderFlags, PacketType, build_header, parse_header,
};
use genvex_tunnel_client::codec::tlv;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub async fn bind_loopback() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0").await.expect("bind mock device socket")
}

/// One request the mock device observed, for test assertions.
#[derive(Debug, Clone)]
pub struct ObservedRequest {
    pub command_tag: u8,
    pub seq: u16,
}

/// A generic tunnel-protocol device double. Answers U_CONNECT with
/// `server_nonce`, CMD_PING with a canned model, datapoint/setpoint reads
/// with the given value lists, and setpoint writes with a bare ack. Runs
/// until the returned handle is aborted.
pub fn spawn_mock_device(
    socket: UdpSocket,
    server_nonce: u32,
    datapoint_values: Vec<i16>,
    setpoint_values: Vec<u16>,
    observed: mpsc::UnboundedSender<ObservedRequest>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = [0u8; 2048];
        loop {
            let (n, from) = match socket.recv_from(&mut buf).await {
                Ok(v) => v,
                Err(_) => break,
            };
            let Ok((_, _, packet_type, flags, seq, _)) = parse_header(&buf[..n]) else {
                continue;
            };

            if PacketType::from_u8(packet_type) == Some(PacketType::UConnect) {
                let mut reply =
                    build_header(0, 0, PacketType::UConnect as u8, HeaderFlags::RESPONSE.bits(), seq, 28)
                        .to_vec();
                reply.extend_from_slice(&[0u8; 4]);
                reply.extend_from_slice(&1u32.to_be_bytes());
                reply.extend_from_slice(&server_nonce.to_be_bytes());
                let _ = socket.send_to(&reply, from).await;
                let _ = observed.send(ObservedRequest { command_tag: 0, seq });
                continue;
            }

            if PacketType::from_u8(packet_type) != Some(PacketType::Data) {
                continue;
            }
            let crypt_offset = if flags & HeaderFlags::TAG.bits() != 0 {
                HEADER_LEN + 2
            } else {
                HEADER_LEN
            };
            let Ok(cmd) = tlv::extract_command_bytes(&buf[..n], crypt_offset) else {
                continue;
            };
            if cmd.len() < 4 {
                continue;
            }
            let tag = cmd[3];
            let _ = observed.send(ObservedRequest { command_tag: tag, seq });

            let response_command: Vec<u8> = match tag {
                t if t == command::CMD_PING => {
                    let mut v = vec![0u8; 20];
                    v[0..4].copy_from_slice(&1u32.to_be_bytes());
                    v[4..8].copy_from_slice(&2u32.to_be_bytes());
                    v
                }
                t if t == command::CMD_DATAPOINT_READLIST => {
                    let mut v = (datapoint_values.len() as u16).to_be_bytes().to_vec();
                    for val in &datapoint_values {
                        v.extend_from_slice(&val.to_be_bytes());
                    }
                    v
                }
                t if t == command::CMD_SETPOINT_READLIST => {
                    let mut v = vec![0u8];
                    v.extend_from_slice(&(setpoint_values.len() as u16).to_be_bytes());
                    for val in &setpoint_values {
                        v.extend_from_slice(&val.to_be_bytes());
                    }
                    v
                }
                t if t == command::CMD_SETPOINT_WRITELIST => vec![0x00],
                _ => continue,
            };

            let crypt = tlv::build_crypt_payload(&response_command);
            let length = (HEADER_LEN + crypt.len() + 2) as u16;
            let mut reply =
                build_header(0, 0, PacketType::Data as u8, HeaderFlags::RESPONSE.bits(), seq, length)
                    .to_vec();
            reply.extend_from_slice(&crypt);
            checksum::append_checksum(&mut reply);
            let _ = socket.send_to(&reply, from).await;
        }
    })
}
