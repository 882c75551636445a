// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::cfg::config::PollingConfig;
use crate::codec::command::SetpointWriteEntry;
use crate::error::TunnelError;
use crate::polling::events::PollEvent;
use crate::registers::common::RegisterCatalog;
use crate::session::{Session, SessionEvent};

/// Owns a [`Session`] and one register catalog, polling both datapoints and
/// readable setpoints every `cfg.interval` and maintaining a cache of
/// last-converted values keyed by register name.
pub struct PollingEngine<C: RegisterCatalog + 'static> {
    session: Arc<Session>,
    catalog: C,
    cfg: PollingConfig,
    cache: Mutex<HashMap<String, f64>>,
    consecutive_errors: AtomicU32,
    events: broadcast::Sender<PollEvent>,
    cancel: CancellationToken,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl<C: RegisterCatalog + 'static> PollingEngine<C> {
    pub fn new(session: Session, catalog: C, cfg: PollingConfig) -> Self {
        let (events, _) = broadcast::channel(128);
        PollingEngine {
            session: Arc::new(session),
            catalog,
            cfg,
            cache: Mutex::new(HashMap::new()),
            consecutive_errors: AtomicU32::new(0),
            events,
            cancel: CancellationToken::new(),
            poll_task: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PollEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: PollEvent) {
        let _ = self.events.send(event);
    }

    /// Brings the session up, forwards its events, and starts polling.
    pub async fn connect(self: &Arc<Self>, email: &str) -> Result<()> {
        self.spawn_session_event_forwarder();
        self.session.connect(email).await?;
        self.start_polling();
        Ok(())
    }

    fn spawn_session_event_forwarder(self: &Arc<Self>) {
        let mut rx = self.session.subscribe();
        let engine = self.clone();
        tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                match event {
                    SessionEvent::Connected { .. } => engine.emit(PollEvent::Connected),
                    SessionEvent::Disconnected => engine.emit(PollEvent::Disconnected),
                    SessionEvent::Model(info) => engine.emit(PollEvent::Model(info)),
                    SessionEvent::Error(cause) => engine.emit(PollEvent::Error(cause)),
                }
            }
        });
    }

    fn start_polling(self: &Arc<Self>) {
        let engine = self.clone();
        let interval_dur = self.cfg.interval;
        let cancel = self.cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval_dur);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        engine.poll_once().await;
                    }
                }
            }
        });
        *self.poll_task.lock().expect("poll task lock poisoned") = Some(handle);
    }

    /// One poll round: datapoints then readable setpoints, emitting `data`
    /// only for values that changed, `polled` on full success, and `error`
    /// plus a consecutive-failure count on any read failure.
    async fn poll_once(self: &Arc<Self>) {
        if !self.session.is_connected() {
            return;
        }

        let result = self.do_poll().await;
        match result {
            Ok(()) => {
                self.consecutive_errors.store(0, Ordering::SeqCst);
                self.emit(PollEvent::Polled);
            }
            Err(e) => {
                warn!(error = %e, "poll failed");
                self.emit(PollEvent::Error(e.to_string()));
                let count = self.consecutive_errors.fetch_add(1, Ordering::SeqCst) + 1;
                if count >= self.cfg.max_consecutive_errors {
                    self.consecutive_errors.store(0, Ordering::SeqCst);
                    error!(count, "too many consecutive poll failures, disconnecting");
                    self.disconnect().await;
                }
            }
        }
    }

    async fn do_poll(&self) -> Result<()> {
        let datapoint_entries = self.catalog.datapoint_request_list();
        let datapoint_values = self.session.read_datapoints(&datapoint_entries).await?;
        for (descriptor, raw) in self.catalog.datapoints().iter().zip(datapoint_values.iter()) {
            let value = self.catalog.convert_datapoint_value(*raw, descriptor);
            self.update_cache_and_emit(descriptor.name, value, descriptor.unit);
        }

        let setpoint_entries = self.catalog.setpoint_request_list();
        let setpoint_values = self.session.read_setpoints(&setpoint_entries).await?;
        let readable_setpoints: Vec<_> =
            self.catalog.setpoints().iter().filter(|s| !s.write_only).collect();
        for (descriptor, raw) in readable_setpoints.iter().zip(setpoint_values.iter()) {
            let value = self.catalog.convert_setpoint_value(*raw, descriptor);
            self.update_cache_and_emit(descriptor.name, value, descriptor.unit);
        }

        Ok(())
    }

    fn update_cache_and_emit(&self, name: &str, value: f64, unit: &'static str) {
        let mut cache = self.cache.lock().expect("cache lock poisoned");
        let changed = cache.get(name).map(|old| *old != value).unwrap_or(true);
        cache.insert(name.to_string(), value);
        drop(cache);
        if changed {
            self.emit(PollEvent::Data { name: name.to_string(), value, unit });
        }
    }

    /// Writes a setpoint by name, validating bounds before touching the
    /// wire, then optimistically updates the cache.
    pub async fn set_value(&self, name: &str, display: f64) -> Result<()> {
        let descriptor = self
            .catalog
            .setpoint_by_name(name)
            .ok_or_else(|| TunnelError::UnknownSetpoint { name: name.to_string() })?;

        let raw = self.catalog.to_raw_setpoint_value(display, descriptor);
        if raw < descriptor.min || raw > descriptor.max {
            return Err(TunnelError::OutOfRange {
                name: name.to_string(),
                raw,
                min: descriptor.min,
                max: descriptor.max,
            }
            .into());
        }

        self.session
            .write_setpoints(&[SetpointWriteEntry {
                id: 0,
                value: raw,
                param: descriptor.write_address,
            }])
            .await?;

        self.update_cache_and_emit(name, display, descriptor.unit);
        Ok(())
    }

    pub async fn set_fan_level(&self, level: i32) -> Result<()> {
        self.set_value("FAN_SPEED", level as f64).await
    }

    pub async fn set_temperature_setpoint(&self, celsius: f64) -> Result<()> {
        self.set_value("TEMP_SETPOINT", celsius).await
    }

    pub fn get_value(&self, name: &str) -> Option<f64> {
        self.cache.lock().expect("cache lock poisoned").get(name).copied()
    }

    pub fn get_all_values(&self) -> HashMap<String, f64> {
        self.cache.lock().expect("cache lock poisoned").clone()
    }

    /// Stops polling and tears down the session. The cache is retained
    /// intact.
    pub async fn disconnect(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.poll_task.lock().expect("poll task lock poisoned").take() {
            handle.abort();
        }
        self.session.disconnect().await;
    }
}
