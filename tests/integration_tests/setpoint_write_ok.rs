// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;
use std::time::Duration;

use super::common::{ObservedRequest, bind_loopback, spawn_mock_device};
use genvex_tunnel_client::cfg::config::{ConnectConfig, PollingConfig, SessionConfig};
use genvex_tunnel_client::codec::command::CMD_SETPOINT_WRITELIST;
use genvex_tunnel_client::polling::PollingEngine;
use genvex_tunnel_client::registers::optima270::Optima270Catalog;
use genvex_tunnel_client::session::Session;
use tokio::sync::mpsc;

/// §8 scenario 4: `setValue("TEMP_SETPOINT", 22.0)` writes raw 120 to write
/// address 12 and the cache reflects the new display value immediately.
#[tokio::test]
async fn test_set_value_writes_converted_raw_and_updates_cache() {
    let device = bind_loopback().await;
    let device_addr = device.local_addr().expect("local addr");
    let (observed_tx, mut observed_rx) = mpsc::unbounded_channel::<ObservedRequest>();

    let device_task = spawn_mock_device(device, 0x3333_4444, vec![], vec![0, 0, 0], observed_tx);

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

    // Poll interval is long enough that it won't race the write below.
    let engine = Arc::new(PollingEngine::new(
        session,
        Optima270Catalog,
        PollingConfig { interval: Duration::from_secs(30), max_consecutive_errors: 3 },
    ));
    engine.connect("user@example.com").await.expect("engine connects");

    engine.set_value("TEMP_SETPOINT", 22.0).await.expect("set_value succeeds");
    assert_eq!(engine.get_value("TEMP_SETPOINT"), Some(22.0));

    let mut saw_write = false;
    while let Ok(req) = observed_rx.try_recv() {
        if req.command_tag == CMD_SETPOINT_WRITELIST {
            saw_write = true;
        }
    }
    assert!(saw_write, "expected the device to observe a CMD_SETPOINT_WRITELIST request");

    engine.disconnect().await;
    device_task.abort();
}
