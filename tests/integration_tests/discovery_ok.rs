// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use genvex_tunnel_client::cfg::config::DiscoveryConfig;
use genvex_tunnel_client::discovery;
use tokio::net::UdpSocket;

fn fast_cfg() -> DiscoveryConfig {
    DiscoveryConfig {
        timeout: Duration::from_millis(500),
        retries: 3,
        retry_interval: Duration::from_millis(100),
    }
}

/// §8 scenario 1: broadcast a discovery request, a single device answers
/// with its id; unicast discovery against that same responder must resolve
/// to the exact address and device id.
#[tokio::test]
async fn test_unicast_discovery_resolves_responder() {
    let device = UdpSocket::bind("127.0.0.1:0").await.expect("bind mock device");
    let device_addr = device.local_addr().expect("local addr");

    let responder = tokio::spawn(async move {
        let mut buf = [0u8; 64];
        let (_, from) = device.recv_from(&mut buf).await.expect("recv discovery request");

        let mut reply = vec![0u8; 25];
        reply[0..4].copy_from_slice(&[0x00, 0x80, 0x00, 0x01]);
        reply[19..24].copy_from_slice(b"GXE42");
        reply[24] = 0x00;
        device.send_to(&reply, from).await.expect("send discovery response");
    });

    let found = discovery::unicast(device_addr, &fast_cfg(), "*")
        .await
        .expect("unicast discovery succeeds");

    assert_eq!(found.device_id, "GXE42");
    assert_eq!(found.addr, device_addr);
    responder.await.expect("responder task");
}
