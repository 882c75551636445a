// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, net::Ipv4Addr, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::cfg::enums::ControllerModel;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Identity and address of the target device.
    pub device: DeviceConfig,
    /// Discovery timing knobs.
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// Connect-handshake timing knobs.
    #[serde(default)]
    pub connect: ConnectConfig,
    /// Per-request timeout and keep-alive cadence.
    #[serde(default)]
    pub session: SessionConfig,
    /// Poll cadence and failure policy.
    #[serde(default)]
    pub polling: PollingConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DeviceConfig {
    #[serde(rename = "Id")]
    /// Device ID announced during discovery, or `"*"` to match any device.
    pub id: String,

    #[serde(rename = "Ip")]
    /// Remote IPv4 address of the controller.
    pub ip: Ipv4Addr,

    #[serde(default = "default_port", rename = "Port")]
    /// Remote UDP port (5570 on essentially all deployments).
    pub port: u16,

    #[serde(rename = "Email")]
    /// Email identifier embedded in the U_CONNECT request.
    pub email: String,

    #[serde(rename = "Model")]
    /// Which register catalog to load.
    pub model: ControllerModel,
}

fn default_port() -> u16 {
    5570
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DiscoveryConfig {
    #[serde(default = "default_discovery_timeout", with = "serde_secs")]
    pub timeout: Duration,
    #[serde(default = "default_discovery_retries")]
    pub retries: u32,
    #[serde(default = "default_discovery_retry_interval", with = "serde_secs")]
    pub retry_interval: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        DiscoveryConfig {
            timeout: default_discovery_timeout(),
            retries: default_discovery_retries(),
            retry_interval: default_discovery_retry_interval(),
        }
    }
}

fn default_discovery_timeout() -> Duration {
    Duration::from_secs(5)
}
fn default_discovery_retries() -> u32 {
    3
}
fn default_discovery_retry_interval() -> Duration {
    Duration::from_secs(1)
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ConnectConfig {
    #[serde(default = "default_connect_retries")]
    pub retries: u32,
    #[serde(default = "default_connect_retry_interval", with = "serde_secs")]
    pub retry_interval: Duration,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        ConnectConfig {
            retries: default_connect_retries(),
            retry_interval: default_connect_retry_interval(),
        }
    }
}

fn default_connect_retries() -> u32 {
    3
}
fn default_connect_retry_interval() -> Duration {
    Duration::from_secs(1)
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_request_timeout", with = "serde_secs")]
    pub request_timeout: Duration,
    #[serde(default = "default_keep_alive_interval", with = "serde_secs")]
    pub keep_alive_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            request_timeout: default_request_timeout(),
            keep_alive_interval: default_keep_alive_interval(),
        }
    }
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}
fn default_keep_alive_interval() -> Duration {
    Duration::from_secs(10)
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval", with = "serde_secs")]
    pub interval: Duration,
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        PollingConfig {
            interval: default_poll_interval(),
            max_consecutive_errors: default_max_consecutive_errors(),
        }
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(30)
}
fn default_max_consecutive_errors() -> u32 {
    3
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and normalizes derived fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(!self.device.id.is_empty(), "device.Id must not be empty");
        ensure!(!self.device.email.is_empty(), "device.Email must not be empty");

        if self.device.port == 0 {
            self.device.port = default_port();
        }
        if self.polling.max_consecutive_errors == 0 {
            self.polling.max_consecutive_errors = default_max_consecutive_errors();
        }
        if self.connect.retries == 0 {
            self.connect.retries = default_connect_retries();
        }
        if self.discovery.retries == 0 {
            self.discovery.retries = default_discovery_retries();
        }

        Ok(())
    }
}

/// Serde helpers for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
