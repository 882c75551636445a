// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use super::common::{bind_loopback, spawn_mock_device};
use genvex_tunnel_client::cfg::config::{ConnectConfig, SessionConfig};
use genvex_tunnel_client::session::{Session, SessionEvent};
use tokio::sync::mpsc;

/// §8 scenario 2: U_CONNECT accepted with server nonce `0xDEADBEEF`; the
/// session transitions to CONNECTED and probes model info on seq 50.
#[tokio::test]
async fn test_connect_handshake_establishes_session() {
    let device = bind_loopback().await;
    let device_addr = device.local_addr().expect("local addr");
    let (observed_tx, _observed_rx) = mpsc::unbounded_channel();
    let device_task = spawn_mock_device(device, 0xDEAD_BEEF, vec![], vec![], observed_tx);

    let session = Session::new(
        device_addr,
        ConnectConfig { retries: 2, retry_interval: Duration::from_millis(200) },
        SessionConfig {
            request_timeout: Duration::from_millis(500),
            keep_alive_interval: Duration::from_secs(10),
        },
    )
    .await
    .expect("bind session socket");

    let mut events = session.subscribe();
    session.connect("user@example.com").await.expect("handshake succeeds");

    assert!(session.is_connected());

    let first = tokio::time::timeout(Duration::from_millis(500), events.recv())
        .await
        .expect("event within timeout")
        .expect("event stream open");
    match first {
        SessionEvent::Connected { server_id } => assert_eq!(server_id, 0xDEAD_BEEF),
        other => panic!("expected Connected first, got {other:?}"),
    }

    let second = tokio::time::timeout(Duration::from_millis(500), events.recv())
        .await
        .expect("event within timeout")
        .expect("event stream open");
    match second {
        SessionEvent::Model(info) => assert_eq!(info.device_number, 1),
        other => panic!("expected Model second, got {other:?}"),
    }

    session.disconnect().await;
    device_task.abort();
}
