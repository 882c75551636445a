// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! UDP broadcast/unicast discovery of tunnel-protocol devices on the local
//! network, per the legacy 12-byte discovery header.

use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddr};

use anyhow::Result;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

use crate::cfg::config::DiscoveryConfig;
use crate::codec::discovery_frame::{build_discovery_packet, parse_discovery_response};
use crate::error::TunnelError;

/// One device that answered a discovery request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub device_id: String,
    pub addr: SocketAddr,
}

/// Broadcasts a discovery request `cfg.retries` times, `cfg.retry_interval`
/// apart, collecting every distinct responder until `cfg.timeout` elapses.
/// `device_id_filter` is typically `"*"` to match any device.
pub async fn broadcast(
    cfg: &DiscoveryConfig,
    port: u16,
    device_id_filter: &str,
) -> Result<Vec<DiscoveredDevice>> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.set_broadcast(true)?;
    let packet = build_discovery_packet(device_id_filter);
    let dest: SocketAddr = (Ipv4Addr::BROADCAST, port).into();

    let mut seen: HashSet<SocketAddr> = HashSet::new();
    let mut found = Vec::new();

    let _ = timeout(cfg.timeout, async {
        for attempt in 0..cfg.retries {
            if let Err(e) = socket.send_to(&packet, dest).await {
                debug!(attempt, error = %e, "discovery broadcast send failed");
                continue;
            }
            let mut buf = [0u8; 512];
            while let Ok(Ok((n, from))) =
                timeout(cfg.retry_interval, socket.recv_from(&mut buf)).await
            {
                if !seen.insert(from) {
                    continue;
                }
                if let Ok(device_id) = parse_discovery_response(&buf[..n]) {
                    found.push(DiscoveredDevice { device_id, addr: from });
                }
            }
        }
    })
    .await;

    if found.is_empty() {
        Err(TunnelError::DiscoveryTimeout.into())
    } else {
        Ok(found)
    }
}

/// Sends a discovery request directly to `addr` (no broadcast), retrying up
/// to `cfg.retries` times.
pub async fn unicast(
    addr: SocketAddr,
    cfg: &DiscoveryConfig,
    device_id_filter: &str,
) -> Result<DiscoveredDevice> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(addr).await?;
    let packet = build_discovery_packet(device_id_filter);

    for attempt in 0..cfg.retries {
        if let Err(e) = socket.send(&packet).await {
            debug!(attempt, error = %e, "discovery unicast send failed");
            continue;
        }
        let mut buf = [0u8; 512];
        if let Ok(Ok(n)) = timeout(cfg.retry_interval, socket.recv(&mut buf)).await {
            if let Ok(device_id) = parse_discovery_response(&buf[..n]) {
                return Ok(DiscoveredDevice { device_id, addr });
            }
        }
    }
    Err(TunnelError::DiscoveryTimeout.into())
}
