// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A `Session` owns one UDP socket connected to one device and drives it
//! through `IDLE` -> `CONNECTING` -> `CONNECTED` -> `CLOSED`. Requests are
//! matched to responses by sequence number through [`pending::PendingTable`];
//! unmatched frames (stray retransmits, keep-alive acks) are silently
//! dropped, never logged as errors.

pub mod pending;
pub mod sequence;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use anyhow::Result;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cfg::config::{ConnectConfig, SessionConfig};
use crate::codec::checksum;
use crate::codec::command::{
    self, DatapointReadEntry, ModelInfo, SetpointReadEntry, SetpointWriteEntry,
};
use crate::codec::header::{HEADER_LEN, HeaderFlags, PacketType, build_header, parse_header};
use crate::codec::tlv;
use crate::error::TunnelError;
use crate::state_machine::common::{StateMachine, Transition};
use crate::state_machine::connect_handshake::{ConnectCtx, ConnectHandshake};
use crate::utils::generate_client_id;
use pending::PendingTable;
use sequence::{SEQ_INITIAL_PING, SequenceCounter};

/// Events emitted for observers (CLIs, the polling engine) to react to
/// without polling `Session`'s internal state.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Connected { server_id: u32 },
    Model(ModelInfo),
    Disconnected,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum SessionState {
    Idle = 0,
    Connecting = 1,
    Connected = 2,
    Closed = 3,
}

impl SessionState {
    fn from_u8(v: u8) -> SessionState {
        match v {
            1 => SessionState::Connecting,
            2 => SessionState::Connected,
            3 => SessionState::Closed,
            _ => SessionState::Idle,
        }
    }
}

/// Distinguishes a read request from a write request so a timed-out or
/// abandoned one surfaces the matching `TunnelError` variant.
#[derive(Debug, Clone, Copy)]
enum RequestKind {
    Read,
    Write,
}

impl RequestKind {
    fn timeout_error(self, seq: u16) -> TunnelError {
        match self {
            RequestKind::Read => TunnelError::ReadTimeout { seq },
            RequestKind::Write => TunnelError::WriteTimeout { seq },
        }
    }
}

/// One connection to one tunnel-protocol device.
pub struct Session {
    socket: Arc<UdpSocket>,
    client_id: u32,
    server_id: Arc<AtomicU32>,
    state: Arc<AtomicU8>,
    pending: PendingTable,
    seq: Arc<SequenceCounter>,
    cancel: CancellationToken,
    events: broadcast::Sender<SessionEvent>,
    connect_cfg: ConnectConfig,
    session_cfg: SessionConfig,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    /// Binds an ephemeral local UDP socket and connects it to `remote`, but
    /// performs no handshake yet; call [`Session::connect`] for that.
    pub async fn new(
        remote: SocketAddr,
        connect_cfg: ConnectConfig,
        session_cfg: SessionConfig,
    ) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(remote).await?;

        let (events, _) = broadcast::channel(64);

        Ok(Session {
            socket: Arc::new(socket),
            client_id: generate_client_id(),
            server_id: Arc::new(AtomicU32::new(0)),
            state: Arc::new(AtomicU8::new(SessionState::Idle as u8)),
            pending: PendingTable::new(),
            seq: Arc::new(SequenceCounter::new()),
            cancel: CancellationToken::new(),
            events,
            connect_cfg,
            session_cfg,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// A receiver for this session's event stream. May be called more than
    /// once; each receiver sees every event emitted after it subscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    fn set_state(&self, s: SessionState) {
        self.state.store(s as u8, Ordering::SeqCst);
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is not an error; the event is simply dropped.
        let _ = self.events.send(event);
    }

    /// Runs the retransmitting U_CONNECT handshake, then starts the
    /// read-loop and keep-alive background tasks.
    #[instrument(skip(self), fields(client_id = self.client_id))]
    pub async fn connect(&self, email: &str) -> Result<()> {
        if self.state() == SessionState::Connected {
            return Ok(());
        }
        self.set_state(SessionState::Connecting);

        let mut ctx = ConnectCtx {
            socket: self.socket.as_ref(),
            client_id: self.client_id,
            email: email.to_string(),
            max_retries: self.connect_cfg.retries,
            retry_interval: self.connect_cfg.retry_interval,
        };
        let mut sm = ConnectHandshake::new();
        let server_id = loop {
            match sm.step(&mut ctx).await {
                Transition::Stay(()) => continue,
                Transition::Done(result) => break result,
                Transition::Next((), _) => unreachable!("handshake has a single state"),
            }
        }?;

        self.server_id.store(server_id, Ordering::SeqCst);
        self.set_state(SessionState::Connected);
        info!(server_id, "connect handshake complete");

        self.spawn_read_loop();
        self.spawn_keep_alive();
        self.emit(SessionEvent::Connected { server_id });

        match self.initial_ping().await {
            Ok(model) => self.emit(SessionEvent::Model(model)),
            Err(e) => warn!(error = %e, "initial ping failed"),
        }

        Ok(())
    }

    fn spawn_read_loop(&self) {
        let socket = self.socket.clone();
        let pending = self.pending.clone();
        let cancel = self.cancel.clone();
        let events = self.events.clone();
        let state = self.state.clone();

        let handle = tokio::spawn(async move {
            let mut buf = [0u8; 2048];
            loop {
                let n = tokio::select! {
                    _ = cancel.cancelled() => break,
                    res = socket.recv(&mut buf) => match res {
                        Ok(n) => n,
                        Err(e) => {
                            let _ = events.send(SessionEvent::Error(e.to_string()));
                            break;
                        }
                    },
                };
                dispatch_frame(&buf[..n], &pending);
            }
            state.store(SessionState::Closed as u8, Ordering::SeqCst);
        });
        self.tasks.lock().expect("tasks lock poisoned").push(handle);
    }

    fn spawn_keep_alive(&self) {
        let socket = self.socket.clone();
        let cancel = self.cancel.clone();
        let seq = self.seq.clone();
        let client_id = self.client_id;
        let server_id = self.server_id.clone();
        let interval_dur = self.session_cfg.keep_alive_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval_dur);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let keepalive_seq = seq.next_keepalive_seq();
                        let frame = build_keep_alive_frame(
                            client_id,
                            server_id.load(Ordering::SeqCst),
                            keepalive_seq,
                        );
                        if let Err(e) = socket.send(&frame).await {
                            debug!(error = %e, "keep-alive send failed");
                        }
                    }
                }
            }
        });
        self.tasks.lock().expect("tasks lock poisoned").push(handle);
    }

    /// Sends `command` wrapped in a DATA/CRYPT frame and awaits the
    /// correlated reply, honoring the session's request timeout.
    async fn request(&self, command: Vec<u8>, kind: RequestKind) -> Result<Vec<u8>> {
        let seq = self.seq.next_user_seq();
        self.request_with_seq(seq, command, kind).await
    }

    /// Same as [`Session::request`] but with an explicitly chosen sequence
    /// number, for the one caller (the post-connect probe) that must use the
    /// reserved seq 50 rather than the user counter. `kind` picks which of
    /// `TunnelError::ReadTimeout`/`WriteTimeout` a timed-out or abandoned
    /// request surfaces as.
    async fn request_with_seq(&self, seq: u16, command: Vec<u8>, kind: RequestKind) -> Result<Vec<u8>> {
        if self.state() != SessionState::Connected {
            return Err(TunnelError::NotConnected.into());
        }
        let frame = build_data_frame(
            self.client_id,
            self.server_id.load(Ordering::SeqCst),
            seq,
            &command,
        );
        let rx = self.pending.insert(seq);
        self.socket.send(&frame).await?;

        match timeout(self.session_cfg.request_timeout, rx).await {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(_recv_error)) => {
                self.pending.remove(seq);
                Err(kind.timeout_error(seq).into())
            }
            Err(_elapsed) => {
                self.pending.remove(seq);
                Err(kind.timeout_error(seq).into())
            }
        }
    }

    /// The probe issued immediately after the handshake completes, on the
    /// reserved sequence number 50 rather than the user counter.
    async fn initial_ping(&self) -> Result<ModelInfo> {
        let bytes = self
            .request_with_seq(SEQ_INITIAL_PING, command::build_ping(), RequestKind::Read)
            .await?;
        Ok(command::parse_ping_response(&bytes))
    }

    pub async fn ping(&self) -> Result<ModelInfo> {
        let bytes = self.request(command::build_ping(), RequestKind::Read).await?;
        Ok(command::parse_ping_response(&bytes))
    }

    pub async fn read_datapoints(&self, entries: &[DatapointReadEntry]) -> Result<Vec<i16>> {
        let bytes = self
            .request(command::build_datapoint_readlist(entries), RequestKind::Read)
            .await?;
        command::parse_datapoint_values(&bytes)
    }

    pub async fn read_setpoints(&self, entries: &[SetpointReadEntry]) -> Result<Vec<u16>> {
        let bytes = self
            .request(command::build_setpoint_readlist(entries), RequestKind::Read)
            .await?;
        command::parse_setpoint_values(&bytes)
    }

    /// Writes a batch of setpoints. The reply is awaited only for
    /// correlation; its body carries no device-level success code to
    /// inspect.
    pub async fn write_setpoints(&self, entries: &[SetpointWriteEntry]) -> Result<()> {
        self.request(command::build_setpoint_writelist(entries), RequestKind::Write)
            .await?;
        Ok(())
    }

    /// Stops the background tasks, drops any in-flight requests, and marks
    /// the session closed. Idempotent.
    pub async fn disconnect(&self) {
        if self.state() == SessionState::Closed {
            return;
        }
        self.cancel.cancel();
        for handle in self.tasks.lock().expect("tasks lock poisoned").drain(..) {
            handle.abort();
        }
        self.pending.drain();
        self.set_state(SessionState::Closed);
        self.emit(SessionEvent::Disconnected);
    }
}

/// 2-byte frame-control tag inserted between the header and the CRYPT
/// payload on TAG-variant frames (keep-alives).
const FRAME_TAG: [u8; 2] = [0x00, 0x03];

/// The header's `length` field includes the two trailing checksum bytes, so
/// it is always computed after the full body (and tag, if any) is known.
fn build_data_frame(client_id: u32, server_id: u32, seq: u16, command: &[u8]) -> Vec<u8> {
    let crypt = tlv::build_crypt_payload(command);
    let length = (HEADER_LEN + crypt.len() + 2) as u16;
    let mut frame = build_header(client_id, server_id, PacketType::Data as u8, 0, seq, length)
        .to_vec();
    frame.extend_from_slice(&crypt);
    checksum::append_checksum(&mut frame);
    frame
}

/// Keep-alive is a plain CMD_PING sent as a DATA/CRYPT frame, but with the
/// `TAG` header flag set and a 2-byte frame-control tag spliced in between
/// the header and the CRYPT payload; both the tag bytes and the checksum's
/// two bytes count toward the declared `length`. It carries a sequence
/// number drawn from the 100-199 ring and is never registered in the
/// pending table, so its reply (or the absence of one) is silently dropped
/// by [`dispatch_frame`] rather than handled specially.
fn build_keep_alive_frame(client_id: u32, server_id: u32, seq: u16) -> Vec<u8> {
    let crypt = tlv::build_crypt_payload(&command::build_ping());
    let length = (HEADER_LEN + FRAME_TAG.len() + crypt.len() + 2) as u16;
    let mut frame = build_header(
        client_id,
        server_id,
        PacketType::Data as u8,
        HeaderFlags::TAG.bits(),
        seq,
        length,
    )
    .to_vec();
    frame.extend_from_slice(&FRAME_TAG);
    frame.extend_from_slice(&crypt);
    checksum::append_checksum(&mut frame);
    frame
}

/// Parses one received datagram and, if it correlates with a pending
/// request, resolves it. Anything that fails to parse, isn't a DATA
/// response, or doesn't match a pending sequence number is silently
/// dropped.
fn dispatch_frame(buf: &[u8], pending: &PendingTable) {
    let Ok((_, _, packet_type, flags, seq, _)) = parse_header(buf) else {
        return;
    };
    if PacketType::from_u8(packet_type) != Some(PacketType::Data) {
        return;
    }
    if flags & HeaderFlags::RESPONSE.bits() == 0 {
        return;
    }

    let crypt_offset = if flags & HeaderFlags::TAG.bits() != 0 {
        HEADER_LEN + 2
    } else {
        HEADER_LEN
    };
    let Ok(command_bytes) = tlv::extract_command_bytes(buf, crypt_offset) else {
        return;
    };
    pending.resolve(seq, command_bytes.to_vec());
}
