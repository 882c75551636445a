// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;
use std::time::Duration;

use super::common::bind_loopback;
use genvex_tunnel_client::cfg::config::{ConnectConfig, PollingConfig, SessionConfig};
use genvex_tunnel_client::codec::checksum;
use genvex_tunnel_client::codec::command::{self, CMD_DATAPOINT_READLIST};
use genvex_tunnel_client::codec::header::{
    HEADER_LEN, HeaderFlags, PacketType, build_header, parse_header,
};
use genvex_tunnel_client::codec::tlv;
use genvex_tunnel_client::polling::{PollEvent, PollingEngine};
use genvex_tunnel_client::registers::optima270::Optima270Catalog;
use genvex_tunnel_client::session::Session;

/// §8 scenario 5: the device stops answering datapoint reads; after
/// `maxConsecutiveErrors` poll failures the session is torn down.
#[tokio::test]
async fn test_consecutive_poll_failures_trigger_disconnect() {
    let device = bind_loopback().await;
    let device_addr = device.local_addr().expect("local addr");

    let device_task = tokio::spawn(async move {
        let mut buf = [0u8; 2048];
        loop {
            let (n, from) = match device.recv_from(&mut buf).await {
                Ok(v) => v,
                Err(_) => break,
            };
            let Ok((_, _, packet_type, flags, seq, _)) = parse_header(&buf[..n]) else { continue };

            if PacketType::from_u8(packet_type) == Some(PacketType::UConnect) {
                let mut reply = build_header(
                    0,
                    0,
                    PacketType::UConnect as u8,
                    HeaderFlags::RESPONSE.bits(),
                    seq,
                    28,
                )
                .to_vec();
                reply.extend_from_slice(&[0u8; 4]);
                reply.extend_from_slice(&1u32.to_be_bytes());
                reply.extend_from_slice(&0xAAAA_BBBBu32.to_be_bytes());
                let _ = device.send_to(&reply, from).await;
                continue;
            }

            if PacketType::from_u8(packet_type) != Some(PacketType::Data) {
                continue;
            }
            let crypt_offset =
                if flags & HeaderFlags::TAG.bits() != 0 { HEADER_LEN + 2 } else { HEADER_LEN };
            let Ok(cmd) = tlv::extract_command_bytes(&buf[..n], crypt_offset) else { continue };
            if cmd.len() < 4 {
                continue;
            }
            // Answer pings (so the initial probe succeeds) but silently drop
            // every datapoint read, forcing the caller to time out.
            if cmd[3] == CMD_DATAPOINT_READLIST {
                continue;
            }
            if cmd[3] == command::CMD_PING {
                let mut model = vec![0u8; 20];
                model[0..4].copy_from_slice(&1u32.to_be_bytes());
                let crypt = tlv::build_crypt_payload(&model);
                let length = (HEADER_LEN + crypt.len() + 2) as u16;
                let mut reply =
                    build_header(0, 0, PacketType::Data as u8, HeaderFlags::RESPONSE.bits(), seq, length)
                        .to_vec();
                reply.extend_from_slice(&crypt);
                checksum::append_checksum(&mut reply);
                let _ = device.send_to(&reply, from).await;
            }
        }
    });

    let session = Session::new(
        device_addr,
        ConnectConfig { retries: 2, retry_interval: Duration::from_millis(200) },
        SessionConfig {
            request_timeout: Duration::from_millis(100),
            keep_alive_interval: Duration::from_secs(10),
        },
    )
    .await
    .expect("bind session socket");

    let engine = Arc::new(PollingEngine::new(
        session,
        Optima270Catalog,
        PollingConfig { interval: Duration::from_millis(150), max_consecutive_errors: 2 },
    ));

    let mut events = engine.subscribe();
    engine.connect("user@example.com").await.expect("engine connects");

    let mut saw_disconnect = false;
    for _ in 0..10 {
        let event = tokio::time::timeout(Duration::from_secs(3), events.recv())
            .await
            .expect("event within timeout")
            .expect("event stream open");
        if matches!(event, PollEvent::Disconnected) {
            saw_disconnect = true;
            break;
        }
    }
    assert!(saw_disconnect, "expected the engine to disconnect after repeated poll failures");

    device_task.abort();
}
