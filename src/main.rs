//! # tracelens
//!
//! Command-line host: loads traces through the mediator, applies the
//! requested navigation and prints the selected entries as JSON.

#![deny(unsafe_code)]

mod cli;
mod host;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracelens_settings::{load_settings, load_settings_from_path};
use tracelens_telemetry::{init_telemetry, TelemetryConfig};

use crate::cli::Cli;
use crate::session::{Requests, Session};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => load_settings_from_path(path),
        None => load_settings(),
    }
    .context("failed to load settings")?;

    init_telemetry(&TelemetryConfig {
        log_level: settings.logging.log_level()?,
        module_levels: settings.logging.module_levels()?,
        json: settings.logging.json,
    })?;
    tracing::info!(files = cli.files.len(), "starting tracelens");

    let requests = Requests {
        files: cli.files.clone(),
        upload: cli.upload,
        remote_timestamp: cli.remote_timestamp,
        focus: cli.focus,
        position: cli.position,
    };
    let mut session = Session::new(&settings);
    session.open(&requests).await?;

    if cli.listen {
        let shutdown = CancellationToken::new();
        let on_signal = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_signal.cancel();
            }
        });
        session.listen(shutdown).await?;
    }

    let summary = serde_json::to_string_pretty(&session.summary())?;
    println!("{summary}");
    Ok(())
}
