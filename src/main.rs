// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use genvex_tunnel_client::{
    cfg::{cli::resolve_config_path, config::Config, logger::init_logger},
    polling::{PollEvent, PollingEngine},
    registers::catalog_for,
    session::Session,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _logger_guard = init_logger("configs/logger.yaml")?;

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "configs/app.example.yaml".into());
    let cfg = resolve_config_path(&config_path)
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    let remote: SocketAddr = (cfg.device.ip, cfg.device.port).into();
    info!(%remote, model = %cfg.device.model, "connecting to device");

    let session = Session::new(remote, cfg.connect.clone(), cfg.session.clone())
        .await
        .context("failed to bind session socket")?;
    let catalog = catalog_for(cfg.device.model);
    let engine = Arc::new(PollingEngine::new(session, catalog, cfg.polling.clone()));

    let mut events = engine.subscribe();
    let event_logger = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                PollEvent::Connected => info!("session connected"),
                PollEvent::Disconnected => info!("session disconnected"),
                PollEvent::Model(model) => info!(?model, "model info"),
                PollEvent::Data { name, value, unit } => info!(%name, value, unit, "reading"),
                PollEvent::Error(cause) => tracing::warn!(%cause, "poll error"),
                PollEvent::Polled => {},
            }
        }
    });

    engine.connect(&cfg.device.email).await.context("failed to connect session")?;

    tokio::signal::ctrl_c().await.context("failed to wait for ctrl-c")?;
    info!("shutting down");
    engine.disconnect().await;
    event_logger.abort();

    Ok(())
}
