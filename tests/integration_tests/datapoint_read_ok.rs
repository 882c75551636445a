// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;
use std::time::Duration;

use super::common::{bind_loopback, spawn_mock_device};
use genvex_tunnel_client::cfg::config::{ConnectConfig, PollingConfig, SessionConfig};
use genvex_tunnel_client::polling::{PollEvent, PollingEngine};
use genvex_tunnel_client::registers::optima270::Optima270Catalog;
use genvex_tunnel_client::session::Session;
use tokio::sync::mpsc;

/// §8 scenario 3: 12 datapoints requested, the device replies with only 11
/// values; the first converts to `supplyTemperature = -9.0`.
#[tokio::test]
async fn test_datapoint_poll_converts_and_caches_values() {
    let device = bind_loopback().await;
    let device_addr = device.local_addr().expect("local addr");
    let (observed_tx, _observed_rx) = mpsc::unbounded_channel();

    // 11 raw values: 210, 200, 214, 224, 45, 50, 40, 160, 100, 0, 0.
    let datapoint_values: Vec<i16> = vec![210, 200, 214, 224, 45, 50, 40, 160, 100, 0, 0];
    let setpoint_values: Vec<u16> = vec![2, 120, 0];
    let device_task =
        spawn_mock_device(device, 0x1111_2222, datapoint_values, setpoint_values, observed_tx);

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

    let engine = Arc::new(PollingEngine::new(
        session,
        Optima270Catalog,
        PollingConfig { interval: Duration::from_millis(80), max_consecutive_errors: 3 },
    ));

    let mut events = engine.subscribe();
    engine.connect("user@example.com").await.expect("engine connects");

    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("poll completes within timeout")
            .expect("event stream open");
        if matches!(event, PollEvent::Polled) {
            break;
        }
    }

    assert_eq!(engine.get_value("TEMP_SUPPLY"), Some(-9.0));
    assert_eq!(engine.get_value("TEMP_OUTSIDE"), Some(-10.0));

    engine.disconnect().await;
    device_task.abort();
}
